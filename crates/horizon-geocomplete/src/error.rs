//! Error types for the autocomplete components.

use std::path::PathBuf;

use horizon_geocomplete_net::{LoaderError, NetworkError};

/// Result type alias for autocomplete operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the combobox render cycle and prop getters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComboboxError {
    /// A required argument was not supplied.
    #[error("{call_site}: the `{parameter}` argument is required")]
    MissingParameter {
        /// Name of the missing argument.
        parameter: &'static str,
        /// The prop getter or action that required it.
        call_site: &'static str,
    },

    /// A composite root element was rendered without applying the root props.
    #[error(
        "a composite root element must apply root_props with a non-empty ref key before end_render"
    )]
    RootPropsNotApplied,
}

impl ComboboxError {
    /// Create a missing-parameter error.
    pub fn missing(parameter: &'static str, call_site: &'static str) -> Self {
        Self::MissingParameter {
            parameter,
            call_site,
        }
    }
}

/// Errors raised while reading or writing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("failed to access settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings text is not valid TOML for the settings schema.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl SettingsError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Any error surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Combobox usage error.
    #[error(transparent)]
    Combobox(#[from] ComboboxError),

    /// Settings error.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The external API could not be loaded.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// HTTP client setup failed.
    #[error(transparent)]
    Network(#[from] NetworkError),
}
