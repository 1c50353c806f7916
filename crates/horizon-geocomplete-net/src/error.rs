//! Error types for the networking module.

/// Errors from talking to the places web service.
///
/// The service wrapper turns every one of these into a soft
/// `UNKNOWN_ERROR` response; they surface directly only from client setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// No connection could be made.
    #[error("could not connect: {0}")]
    Connect(String),

    /// The request failed in transit.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}{}", body_suffix(.body))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, when there was one.
        body: Option<String>,
    },

    /// The response body was not the expected JSON.
    #[error("malformed response body: {0}")]
    Decode(String),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_deref().map(|b| format!(": {b}")).unwrap_or_default()
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
