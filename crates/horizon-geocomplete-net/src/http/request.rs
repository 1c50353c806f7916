//! GET request construction.

use std::time::Duration;

use horizon_geocomplete_core::logging::targets;
use url::Url;

use super::client::HttpClient;
use super::response::HttpResponse;
use crate::error::{NetworkError, Result};

/// A request ready to send: the endpoint with its query string applied.
#[derive(Debug)]
pub struct HttpRequest {
    /// Full URL including query parameters.
    pub url: Url,
    /// Extra headers for this request.
    pub headers: http::HeaderMap,
    /// Per-request timeout, overriding the client's.
    pub timeout: Option<Duration>,
}

/// Builder for a GET request against a JSON endpoint.
pub struct HttpRequestBuilder {
    client: HttpClient,
    endpoint: String,
    headers: http::HeaderMap,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl HttpRequestBuilder {
    pub(crate) fn new(client: HttpClient, endpoint: String) -> Self {
        Self {
            client,
            endpoint,
            headers: http::HeaderMap::new(),
            query: Vec::new(),
            timeout: None,
        }
    }

    /// Add a header. Names or values that are not valid HTTP are dropped.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(target: targets::HTTP, "dropping invalid header"),
        }
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter when `value` is present and non-empty.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value.map(Into::into) {
            Some(value) if !value.is_empty() => self.query(key, value),
            _ => self,
        }
    }

    /// Override the client timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the URL without sending.
    pub fn build(&self) -> Result<HttpRequest> {
        let mut url = Url::parse(&self.endpoint).map_err(NetworkError::from)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(HttpRequest {
            url,
            headers: self.headers.clone(),
            timeout: self.timeout,
        })
    }

    /// Send the request.
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint), target = "horizon_geocomplete_net::http", level = "debug")]
    pub async fn send(self) -> Result<HttpResponse> {
        let request = self.build()?;
        let mut builder = self
            .client
            .reqwest_client()
            .get(request.url)
            .headers(request.headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;
        tracing::trace!(target: targets::HTTP, status = response.status().as_u16(), "response received");
        Ok(HttpResponse::new(response))
    }
}
