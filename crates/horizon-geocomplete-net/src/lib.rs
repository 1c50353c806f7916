//! Networking module for Horizon Geocomplete.
//!
//! This crate provides the pieces of the autocomplete widget that talk to the
//! outside world:
//!
//! - **Places**: the [`PlacesApi`](places::PlacesApi) trait and its JSON web service implementation
//! - **Loader**: once-only loading of the external maps API, shared by every caller
//! - **HTTP Client**: a thin `reqwest` wrapper used by the web service
//! - **Async debouncing**: last-call-wins scheduling of network work
//!
//! # Places
//!
//! ```ignore
//! use horizon_geocomplete_net::places::{PlacesApi, PlacesWebService, PredictionRequest};
//!
//! let service = PlacesWebService::new("my-key")?;
//! let response = service.place_predictions(PredictionRequest::new("berl")).await;
//! if response.is_ok() {
//!     for prediction in &response.results {
//!         println!("{}", prediction.structured_formatting.main_text);
//!     }
//! }
//! ```
//!
//! # Loader
//!
//! ```ignore
//! use horizon_geocomplete_net::loader::{LoaderOptions, LoaderService};
//!
//! let service = LoaderService::new();
//! let loader = service.init(LoaderOptions::with_api_key("my-key"), host)?;
//!
//! // Both calls share one script injection.
//! let (a, b) = tokio::join!(loader.load(), loader.load());
//! ```
//!
//! # Async Runtime
//!
//! Work is spawned on the caller's tokio runtime when one is running and on a
//! small shared runtime otherwise. See [`runtime`].

mod debounce;
mod error;
pub mod http;
pub mod loader;
pub mod places;
pub mod runtime;

pub use debounce::AsyncDebouncer;
pub use error::{NetworkError, Result};
pub use loader::{ApiLoader, LoadState, LoaderError, LoaderOptions, LoaderService, ScriptHost};
pub use places::{
    GeocodeRequest, GeocodeResult, PlacesApi, PlacesResponse, PlacesWebService, Prediction,
    PredictionRequest, ServiceStatus,
};
