//! The shared HTTP client.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::request::HttpRequestBuilder;
use crate::error::{NetworkError, Result};

/// HTTP client settings, loadable from the `[http]` settings table.
///
/// Durations are written in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Whole-request timeout.
    #[serde(with = "duration_ms")]
    pub timeout: Option<Duration>,
    /// Connection establishment timeout.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Option<Duration>,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
            connect_timeout: Some(Duration::from_secs(5)),
            user_agent: Some(format!(
                "HorizonGeocomplete/{} (Rust)",
                env!("CARGO_PKG_VERSION")
            )),
        }
    }
}

/// Builds an [`HttpClient`].
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    headers: http::HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::from_config(HttpClientConfig::default())
    }
}

impl HttpClientBuilder {
    /// Start from `config`.
    pub fn from_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            headers: http::HeaderMap::new(),
        }
    }

    /// Set the whole-request timeout; `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Send `name: value` with every request.
    pub fn default_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = http::HeaderName::try_from(name)
            .map_err(|e| NetworkError::InvalidHeader(format!("{name:?}: {e}")))?;
        let value = http::HeaderValue::try_from(value)
            .map_err(|e| NetworkError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = reqwest::Client::builder().default_headers(self.headers);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                client: builder.build()?,
                config: self.config,
            }),
        })
    }
}

struct ClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

/// A cloneable client; clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    /// A client with default settings.
    pub fn new() -> Result<Self> {
        HttpClientBuilder::default().build()
    }

    /// Start configuring a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// Start a GET request to `endpoint`.
    pub fn get(&self, endpoint: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(self.clone(), endpoint.into())
    }

    pub(crate) fn reqwest_client(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
