//! TOML settings for the autocomplete components.
//!
//! Every table and key is optional; missing values take their defaults.
//!
//! ```toml
//! [loader]
//! api_key = "my-key"
//! language = "de"
//!
//! [fetch]
//! min_length = 2
//! debounce_ms = 200
//!
//! [combobox]
//! id = "city"
//! default_highlighted_index = 0
//!
//! [http]
//! timeout = 5000
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use horizon_geocomplete_core::logging::targets;
use horizon_geocomplete_net::http::{HttpClient, HttpClientBuilder, HttpClientConfig};
use horizon_geocomplete_net::places::{GEOCODE_TYPE, PlacesWebService};
use horizon_geocomplete_net::{LoaderError, LoaderOptions};
use serde::{Deserialize, Serialize};

use crate::combobox::{ComboboxConfig, DEFAULT_SCROLL_SUPPRESSION};
use crate::error::{Error, SettingsError};
use crate::fetcher::{DEFAULT_FETCH_DEBOUNCE, FetchOptions};
use crate::status::DEFAULT_STATUS_DEBOUNCE;

/// `[fetch]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Queries with this many characters or fewer are not sent.
    pub min_length: usize,
    /// Quiet interval before a query is sent, in milliseconds.
    pub debounce_ms: u64,
    /// Place type filter.
    pub types: Vec<String>,
    /// Result language.
    pub language: Option<String>,
    /// Region bias.
    pub region: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            min_length: 0,
            debounce_ms: DEFAULT_FETCH_DEBOUNCE.as_millis() as u64,
            types: vec![GEOCODE_TYPE.to_string()],
            language: None,
            region: None,
        }
    }
}

/// `[combobox]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboboxSettings {
    /// Element id prefix.
    pub id: Option<String>,
    /// Highlighted index at mount and after select/reset.
    pub default_highlighted_index: Option<usize>,
    /// Input text at mount.
    pub default_input_value: String,
    /// Open state at mount.
    pub default_is_open: bool,
    /// Fixed item count.
    pub item_count: Option<usize>,
    /// Status announcement window, in milliseconds.
    pub status_debounce_ms: u64,
    /// Hover scroll-suppression window, in milliseconds.
    pub scroll_suppression_ms: u64,
}

impl Default for ComboboxSettings {
    fn default() -> Self {
        Self {
            id: None,
            default_highlighted_index: None,
            default_input_value: String::new(),
            default_is_open: false,
            item_count: None,
            status_debounce_ms: DEFAULT_STATUS_DEBOUNCE.as_millis() as u64,
            scroll_suppression_ms: DEFAULT_SCROLL_SUPPRESSION.as_millis() as u64,
        }
    }
}

/// All settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocompleteSettings {
    /// Script loader options.
    pub loader: LoaderOptions,
    /// Prediction fetching.
    pub fetch: FetchSettings,
    /// Combobox defaults.
    pub combobox: ComboboxSettings,
    /// HTTP client used by the web service.
    pub http: HttpClientConfig,
}

impl GeocompleteSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|e| SettingsError::io(path, e))
    }

    /// Fetcher options.
    pub fn fetch_options(&self) -> FetchOptions {
        let fetch = &self.fetch;
        FetchOptions {
            min_length: fetch.min_length,
            debounce: Duration::from_millis(fetch.debounce_ms),
            types: fetch.types.clone(),
            language: fetch.language.clone().or_else(|| self.loader.language.clone()),
            region: fetch.region.clone().or_else(|| self.loader.region.clone()),
        }
    }

    /// Combobox configuration using `Display` as the item-to-string conversion.
    pub fn combobox_config<T: fmt::Display + 'static>(&self) -> ComboboxConfig<T> {
        let combobox = &self.combobox;
        let mut config = ComboboxConfig::default()
            .with_default_highlighted_index(combobox.default_highlighted_index)
            .with_default_input_value(combobox.default_input_value.clone())
            .with_default_is_open(combobox.default_is_open)
            .with_item_count(combobox.item_count)
            .with_status_debounce(Duration::from_millis(combobox.status_debounce_ms))
            .with_scroll_suppression(Duration::from_millis(combobox.scroll_suppression_ms));
        if let Some(id) = &combobox.id {
            config = config.with_id(id.clone());
        }
        config
    }

    /// Build the HTTP client.
    pub fn http_client(&self) -> Result<HttpClient, Error> {
        Ok(HttpClientBuilder::from_config(self.http.clone()).build()?)
    }

    /// Build the places web service from the loader's API key.
    pub fn places_service(&self) -> Result<PlacesWebService, Error> {
        let api_key = self
            .loader
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(LoaderError::MissingCredentials)?;
        let mut service = PlacesWebService::with_client(self.http_client()?, api_key);
        if let Some(language) = &self.loader.language {
            service = service.with_language(language.clone());
        }
        if let Some(region) = &self.loader.region {
            service = service.with_region(region.clone());
        }
        Ok(service)
    }
}
