//! Responses from JSON endpoints.

use serde::de::DeserializeOwned;

use crate::error::{NetworkError, Result};

/// A received response.
pub struct HttpResponse {
    inner: reqwest::Response,
}

impl HttpResponse {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Turn a non-2xx response into [`NetworkError::Status`], keeping the body.
    pub async fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let body = self.inner.text().await.ok().filter(|b| !b.is_empty());
        Err(NetworkError::Status { status, body })
    }

    /// The body as text.
    pub async fn text(self) -> Result<String> {
        Ok(self.inner.text().await?)
    }

    /// Decode the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status())
            .field("url", &self.inner.url().as_str())
            .finish()
    }
}
