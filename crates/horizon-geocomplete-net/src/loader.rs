//! Once-only loading of the external maps API.
//!
//! The API is installed by a script the host environment injects. An
//! [`ApiLoader`] makes sure that happens at most once: the first
//! [`load`](ApiLoader::load) starts the injection, every other caller (including
//! ones that arrive while the script is still loading) waits for the same
//! outcome.
//!
//! Loaders are handed out by a [`LoaderService`], an explicit service object
//! that owns the single loader for its configuration. Pass the service by
//! reference to whatever needs the API; tests create their own service or call
//! [`LoaderService::reset`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use horizon_geocomplete_net::loader::{LoaderOptions, LoaderService};
//!
//! let service = LoaderService::new();
//! let loader = service.init(LoaderOptions::with_api_key("my-key"), Arc::new(host))?;
//! let maps = loader.load().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::Instrument;
use url::Url;

use horizon_geocomplete_core::logging::span_names;
use horizon_geocomplete_core::logging::targets::LOADER as TARGET;

use crate::runtime;

/// Default script endpoint.
pub const DEFAULT_SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Default name of the global callback the script invokes once ready.
pub const DEFAULT_CALLBACK: &str = "__googleMapsCallback";

/// Errors reported by the loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// Neither an API key nor a client id was supplied.
    #[error("either an API key or a client id must be supplied")]
    MissingCredentials,

    /// Both an API key and a client id were supplied.
    #[error("supply an API key or a client id, not both")]
    ConflictingCredentials,

    /// The service was already initialized with different options.
    #[error("loader already initialized with different options")]
    OptionsMismatch,

    /// The script URL could not be built.
    #[error("invalid script URL: {0}")]
    InvalidUrl(String),

    /// The script failed to load.
    #[error("failed to load the maps API: {0}")]
    LoadFailed(String),
}

impl From<url::ParseError> for LoaderError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Options that determine which script is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// API key.
    pub api_key: Option<String>,
    /// Premium-plan client id.
    pub client: Option<String>,
    /// Script endpoint.
    pub url: String,
    /// Name of the global callback.
    pub callback: String,
    /// Libraries to load alongside the core API.
    pub libraries: Vec<String>,
    /// API version.
    pub version: String,
    /// Usage-tracking channel.
    pub channel: Option<String>,
    /// Interface language.
    pub language: Option<String>,
    /// Region bias.
    pub region: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            client: None,
            url: DEFAULT_SCRIPT_URL.to_string(),
            callback: DEFAULT_CALLBACK.to_string(),
            libraries: vec!["places".to_string()],
            version: "3".to_string(),
            channel: None,
            language: None,
            region: None,
        }
    }
}

impl LoaderOptions {
    /// Options authenticating with an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Options authenticating with a client id.
    pub fn with_client(client: impl Into<String>) -> Self {
        Self {
            client: Some(client.into()),
            ..Self::default()
        }
    }

    /// Set the script endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the callback name.
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = callback.into();
        self
    }

    /// Replace the library list.
    pub fn with_libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the API version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Check that exactly one credential is present. Empty strings count as absent.
    pub fn validate(&self) -> Result<(), LoaderError> {
        match (non_empty(&self.api_key), non_empty(&self.client)) {
            (Some(_), Some(_)) => Err(LoaderError::ConflictingCredentials),
            (None, None) => Err(LoaderError::MissingCredentials),
            _ => Ok(()),
        }
    }

    /// Build the script URL, omitting empty parameters.
    pub fn script_url(&self) -> Result<Url, LoaderError> {
        let mut url = Url::parse(&self.url)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(key) = non_empty(&self.api_key) {
                query.append_pair("key", key);
            }
            if let Some(client) = non_empty(&self.client) {
                query.append_pair("client", client);
            }
            if !self.callback.is_empty() {
                query.append_pair("callback", &self.callback);
            }
            let libraries: Vec<&str> = self
                .libraries
                .iter()
                .map(String::as_str)
                .filter(|lib| !lib.is_empty())
                .collect();
            if !libraries.is_empty() {
                query.append_pair("libraries", &libraries.join(","));
            }
            if !self.version.is_empty() {
                query.append_pair("v", &self.version);
            }
            for (name, value) in [
                ("channel", &self.channel),
                ("language", &self.language),
                ("region", &self.region),
            ] {
                if let Some(value) = non_empty(value) {
                    query.append_pair(name, value);
                }
            }
        }
        Ok(url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// The environment that installs the external API.
pub trait ScriptHost: Send + Sync + 'static {
    /// The global object the script installs.
    type Global: Send + Sync + 'static;

    /// The global, if something already installed it.
    fn installed(&self) -> Option<Arc<Self::Global>>;

    /// Inject the script and resolve once it has loaded or failed.
    fn inject(&self, url: Url) -> impl Future<Output = Result<Arc<Self::Global>, String>> + Send;
}

/// Progress of a loader.
#[derive(Debug)]
pub enum LoadState<G> {
    /// Nothing requested yet.
    Idle,
    /// The script has been injected and has not finished.
    Loading,
    /// The global is available.
    Loaded(Arc<G>),
    /// The script failed to load.
    Failed(String),
}

impl<G> Clone for LoadState<G> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Loaded(global) => Self::Loaded(global.clone()),
            Self::Failed(message) => Self::Failed(message.clone()),
        }
    }
}

impl<G> LoadState<G> {
    fn outcome(&self) -> Option<Result<Arc<G>, LoaderError>> {
        match self {
            Self::Loaded(global) => Some(Ok(global.clone())),
            Self::Failed(message) => Some(Err(LoaderError::LoadFailed(message.clone()))),
            Self::Idle | Self::Loading => None,
        }
    }
}

struct LoaderInner<H: ScriptHost> {
    options: LoaderOptions,
    host: Arc<H>,
    state: watch::Sender<LoadState<H::Global>>,
    injections: AtomicUsize,
}

/// Loads the external API at most once and shares the result.
pub struct ApiLoader<H: ScriptHost> {
    inner: Arc<LoaderInner<H>>,
}

impl<H: ScriptHost> Clone for ApiLoader<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: ScriptHost> ApiLoader<H> {
    /// Create a loader after validating the options.
    ///
    /// Most code should go through [`LoaderService::init`] instead.
    pub fn new(options: LoaderOptions, host: Arc<H>) -> Result<Self, LoaderError> {
        options.validate()?;
        let (state, _) = watch::channel(LoadState::Idle);
        Ok(Self {
            inner: Arc::new(LoaderInner {
                options,
                host,
                state,
                injections: AtomicUsize::new(0),
            }),
        })
    }

    /// The options this loader was created with.
    pub fn options(&self) -> &LoaderOptions {
        &self.inner.options
    }

    /// Current progress.
    pub fn state(&self) -> LoadState<H::Global> {
        self.inner.state.borrow().clone()
    }

    /// Whether the global is available.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.inner.state.borrow(), LoadState::Loaded(_))
    }

    /// How many times the script has been injected.
    pub fn injection_count(&self) -> usize {
        self.inner.injections.load(Ordering::SeqCst)
    }

    /// Resolve with the installed global, loading it first if needed.
    ///
    /// Concurrent and late callers share the single injection. A failure is
    /// reported to every caller and stays until the owning service is reset.
    #[tracing::instrument(skip(self), target = "horizon_geocomplete_net::loader", level = "debug")]
    pub async fn load(&self) -> Result<Arc<H::Global>, LoaderError> {
        if let Some(outcome) = self.inner.state.borrow().outcome() {
            return outcome;
        }

        if let Some(global) = self.inner.host.installed() {
            tracing::debug!(target: TARGET, "API already installed");
            self.inner.state.send_if_modified(|state| match state {
                LoadState::Idle => {
                    *state = LoadState::Loaded(global.clone());
                    true
                }
                _ => false,
            });
            if let Some(outcome) = self.inner.state.borrow().outcome() {
                return outcome;
            }
        }

        let mut rx = self.inner.state.subscribe();
        self.start_injection()?;

        let state = rx
            .wait_for(|state| state.outcome().is_some())
            .await
            .map_err(|_| LoaderError::LoadFailed("loader shut down".to_string()))?;
        state
            .outcome()
            .unwrap_or_else(|| Err(LoaderError::LoadFailed("loader shut down".to_string())))
    }

    fn start_injection(&self) -> Result<(), LoaderError> {
        let url = self.inner.options.script_url()?;
        let started = self.inner.state.send_if_modified(|state| match state {
            LoadState::Idle => {
                *state = LoadState::Loading;
                true
            }
            _ => false,
        });
        if !started {
            return Ok(());
        }

        self.inner.injections.fetch_add(1, Ordering::SeqCst);
        tracing::info!(target: TARGET, %url, "injecting API script");

        let span = tracing::info_span!(target: TARGET, span_names::LOAD, %url);
        let inner = self.inner.clone();
        runtime::spawn(
            async move {
                let next = match inner.host.inject(url).await {
                    Ok(global) => {
                        tracing::info!(target: TARGET, "API script loaded");
                        LoadState::Loaded(global)
                    }
                    Err(message) => {
                        tracing::error!(target: TARGET, %message, "API script failed to load");
                        LoadState::Failed(message)
                    }
                };
                inner.state.send_replace(next);
            }
            .instrument(span),
        );
        Ok(())
    }
}

impl<H: ScriptHost> std::fmt::Debug for ApiLoader<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiLoader")
            .field("options", &self.inner.options)
            .field("injections", &self.injection_count())
            .finish()
    }
}

/// Owns the single [`ApiLoader`] for a process or test.
pub struct LoaderService<H: ScriptHost> {
    current: Mutex<Option<ApiLoader<H>>>,
}

impl<H: ScriptHost> Default for LoaderService<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ScriptHost> LoaderService<H> {
    /// Create an empty service.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Get the loader, creating it on first use.
    ///
    /// Repeated calls with equal options return the same loader. Options are
    /// validated before anything else.
    pub fn init(&self, options: LoaderOptions, host: Arc<H>) -> Result<ApiLoader<H>, LoaderError> {
        options.validate()?;

        let mut current = self.current.lock();
        if let Some(loader) = current.as_ref() {
            return if loader.options() == &options {
                Ok(loader.clone())
            } else {
                tracing::warn!(target: TARGET, "loader re-initialized with different options");
                Err(LoaderError::OptionsMismatch)
            };
        }

        let loader = ApiLoader::new(options, host)?;
        *current = Some(loader.clone());
        Ok(loader)
    }

    /// The loader, if initialized.
    pub fn get(&self) -> Option<ApiLoader<H>> {
        self.current.lock().clone()
    }

    /// Drop the current loader. The next `init` starts from scratch.
    pub fn reset(&self) {
        if self.current.lock().take().is_some() {
            tracing::debug!(target: TARGET, "loader service reset");
        }
    }
}

impl<H: ScriptHost> std::fmt::Debug for LoaderService<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderService")
            .field("current", &*self.current.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credentials() {
        assert_eq!(
            LoaderOptions::default().validate(),
            Err(LoaderError::MissingCredentials)
        );
        assert_eq!(
            LoaderOptions::with_api_key("").validate(),
            Err(LoaderError::MissingCredentials)
        );

        let mut both = LoaderOptions::with_api_key("key");
        both.client = Some("gme-client".to_string());
        assert_eq!(both.validate(), Err(LoaderError::ConflictingCredentials));

        assert!(LoaderOptions::with_client("gme-client").validate().is_ok());
    }

    #[test]
    fn test_script_url_defaults() {
        let url = LoaderOptions::with_api_key("abc").script_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://maps.googleapis.com/maps/api/js?key=abc&callback=__googleMapsCallback&libraries=places&v=3"
        );
    }

    #[test]
    fn test_script_url_all_parameters() {
        let url = LoaderOptions::with_client("gme-client")
            .with_callback("ready")
            .with_libraries(["places", "geometry"])
            .with_version("weekly")
            .with_channel("web")
            .with_language("de")
            .with_region("DE")
            .script_url()
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let names: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["client", "callback", "libraries", "v", "channel", "language", "region"]
        );
        assert_eq!(pairs[2].1, "places,geometry");
    }

    #[test]
    fn test_script_url_omits_empty_values() {
        let url = LoaderOptions::with_api_key("abc")
            .with_libraries(Vec::<String>::new())
            .with_version("")
            .with_language("")
            .script_url()
            .unwrap();
        assert_eq!(url.query(), Some("key=abc&callback=__googleMapsCallback"));
    }
}
