//! HTTP client for Horizon Geocomplete.
//!
//! A thin layer over `reqwest` used by the places web service.
//!
//! ```ignore
//! use horizon_geocomplete_net::http::HttpClient;
//!
//! let client = HttpClient::new()?;
//! let response = client
//!     .get("https://maps.googleapis.com/maps/api/geocode/json")
//!     .query("place_id", "ChIJAVkDPzdOqEcRcDteW0YgIQQ")
//!     .query("key", api_key)
//!     .send()
//!     .await?;
//! ```

mod client;
mod request;
mod response;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::HttpResponse;
