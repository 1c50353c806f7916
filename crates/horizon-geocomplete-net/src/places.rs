//! Place autocomplete and geocoding.
//!
//! [`PlacesApi`] is the seam between the autocomplete components and the
//! vendor service. [`PlacesWebService`] implements it over the JSON web
//! endpoints; tests and embedders can provide their own implementation.
//!
//! Failures never surface as errors here. A transport problem, an HTTP error
//! status or an unreadable body all come back as
//! [`ServiceStatus::UnknownError`] with no results, which is how the service
//! itself reports trouble.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use horizon_geocomplete_core::logging::targets::PLACES as TARGET;

use crate::error::Result;
use crate::http::{HttpClient, HttpRequestBuilder};

/// Default base URL of the web service endpoints.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// The category filter used for address-style predictions.
pub const GEOCODE_TYPE: &str = "geocode";

/// Status code returned with every places response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceStatus {
    /// The request succeeded and results are present.
    Ok,
    /// The request succeeded but matched nothing.
    ZeroResults,
    /// The quota was exceeded.
    OverQueryLimit,
    /// The request was rejected, usually because of the key.
    RequestDenied,
    /// The request was malformed.
    InvalidRequest,
    /// The referenced place does not exist.
    NotFound,
    /// A server or transport error; retrying may succeed.
    UnknownError,
}

impl ServiceStatus {
    /// The wire code for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Parse a wire code. Unrecognized codes map to [`ServiceStatus::UnknownError`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "NOT_FOUND" => Self::NotFound,
            _ => Self::UnknownError,
        }
    }

    /// Whether this is the success status.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServiceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// A span of matched text, in UTF-16 code units as reported by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSubstring {
    /// Start of the match.
    pub offset: usize,
    /// Length of the match.
    pub length: usize,
}

impl MatchedSubstring {
    /// Create a matched span.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }
}

/// The main/secondary split of a prediction's description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFormatting {
    /// Main text, usually the place name.
    pub main_text: String,
    /// Matches of the query inside `main_text`.
    #[serde(default)]
    pub main_text_matched_substrings: Vec<MatchedSubstring>,
    /// Secondary text, usually the locality.
    #[serde(default)]
    pub secondary_text: String,
}

/// One term of a prediction's description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionTerm {
    /// Offset of the term inside the description.
    pub offset: usize,
    /// The term text.
    pub value: String,
}

/// A single autocomplete prediction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// The full human-readable description.
    pub description: String,
    /// Identifier used for geocoding the prediction.
    pub place_id: String,
    /// Matches of the query inside `description`.
    #[serde(default)]
    pub matched_substrings: Vec<MatchedSubstring>,
    /// Main/secondary split of `description`.
    #[serde(default)]
    pub structured_formatting: StructuredFormatting,
    /// Description terms.
    #[serde(default)]
    pub terms: Vec<PredictionTerm>,
    /// Place types.
    #[serde(default)]
    pub types: Vec<String>,
}

/// A latitude/longitude pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Geometry of a geocoding result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// The geocoded point.
    pub location: LatLng,
    /// Precision of the point, e.g. `ROOFTOP` or `APPROXIMATE`.
    #[serde(default)]
    pub location_type: Option<String>,
}

/// One component of a structured address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Full name.
    pub long_name: String,
    /// Abbreviated name.
    pub short_name: String,
    /// Component types.
    #[serde(default)]
    pub types: Vec<String>,
}

/// A single geocoding result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Formatted address.
    pub formatted_address: String,
    /// Place identifier.
    #[serde(default)]
    pub place_id: String,
    /// Geometry of the result.
    #[serde(default)]
    pub geometry: Geometry,
    /// Structured address components.
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    /// Result types.
    #[serde(default)]
    pub types: Vec<String>,
}

/// Results plus the status the service reported.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacesResponse<T> {
    /// The results; empty unless `status` is OK.
    pub results: Vec<T>,
    /// The reported status.
    pub status: ServiceStatus,
}

impl<T> PlacesResponse<T> {
    /// A successful response.
    pub fn ok(results: Vec<T>) -> Self {
        Self {
            results,
            status: ServiceStatus::Ok,
        }
    }

    /// A response carrying no results.
    pub fn empty(status: ServiceStatus) -> Self {
        Self {
            results: Vec::new(),
            status,
        }
    }

    /// Whether the status is OK.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Parameters of a prediction request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictionRequest {
    /// The text typed by the user.
    pub input: String,
    /// Category filter.
    pub types: Vec<String>,
    /// Result language.
    pub language: Option<String>,
    /// Region bias.
    pub region: Option<String>,
}

impl PredictionRequest {
    /// A request filtered to the [`GEOCODE_TYPE`] category.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            types: vec![GEOCODE_TYPE.to_string()],
            language: None,
            region: None,
        }
    }

    /// Replace the category filter.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the result language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the region bias.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Parameters of a geocoding request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeocodeRequest {
    /// The place to geocode.
    pub place_id: String,
}

impl GeocodeRequest {
    /// Geocode a place by id.
    pub fn new(place_id: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
        }
    }
}

/// The place prediction and geocoding operations the components need.
pub trait PlacesApi: Send + Sync + 'static {
    /// Fetch predictions for partially typed input.
    fn place_predictions(
        &self,
        request: PredictionRequest,
    ) -> impl Future<Output = PlacesResponse<Prediction>> + Send;

    /// Geocode a place id.
    fn geocode(
        &self,
        request: GeocodeRequest,
    ) -> impl Future<Output = PlacesResponse<GeocodeResult>> + Send;
}

impl<P: PlacesApi> PlacesApi for Arc<P> {
    fn place_predictions(
        &self,
        request: PredictionRequest,
    ) -> impl Future<Output = PlacesResponse<Prediction>> + Send {
        (**self).place_predictions(request)
    }

    fn geocode(
        &self,
        request: GeocodeRequest,
    ) -> impl Future<Output = PlacesResponse<GeocodeResult>> + Send {
        (**self).geocode(request)
    }
}

#[derive(Deserialize)]
struct AutocompleteBody {
    #[serde(default)]
    predictions: Vec<Prediction>,
    status: ServiceStatus,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeBody {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: ServiceStatus,
    #[serde(default)]
    error_message: Option<String>,
}

/// [`PlacesApi`] over the JSON web service.
///
/// ```ignore
/// use horizon_geocomplete_net::places::{PlacesApi, PlacesWebService, PredictionRequest};
///
/// let service = PlacesWebService::new("my-key")?.with_language("de");
/// let response = service.place_predictions(PredictionRequest::new("berl")).await;
/// for prediction in response.results {
///     println!("{}", prediction.description);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PlacesWebService {
    client: HttpClient,
    base_url: String,
    api_key: String,
    language: Option<String>,
    region: Option<String>,
}

impl PlacesWebService {
    /// Create a service with a default HTTP client.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(HttpClient::new()?, api_key))
    }

    /// Create a service on an existing HTTP client.
    pub fn with_client(client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            language: None,
            region: None,
        }
    }

    /// Override the base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Default result language for requests that don't set one.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Default region bias for requests that don't set one.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch<B: serde::de::DeserializeOwned>(request: HttpRequestBuilder) -> Result<B> {
        let response = request.send().await?.ensure_success().await?;
        response.json().await
    }

    async fn autocomplete(&self, request: PredictionRequest) -> Result<AutocompleteBody> {
        let mut builder = self
            .client
            .get(self.endpoint("place/autocomplete/json"))
            .query("input", request.input);
        if !request.types.is_empty() {
            builder = builder.query("types", request.types.join("|"));
        }
        let builder = builder
            .query("key", self.api_key.as_str())
            .query_opt("language", request.language.or_else(|| self.language.clone()))
            .query_opt("region", request.region.or_else(|| self.region.clone()));
        Self::fetch(builder).await
    }

    async fn geocode_place(&self, request: GeocodeRequest) -> Result<GeocodeBody> {
        let builder = self
            .client
            .get(self.endpoint("geocode/json"))
            .query("place_id", request.place_id)
            .query("key", self.api_key.as_str())
            .query_opt("language", self.language.clone());
        Self::fetch(builder).await
    }
}

impl PlacesApi for PlacesWebService {
    #[tracing::instrument(skip(self, request), fields(input = %request.input), target = "horizon_geocomplete_net::places", level = "debug")]
    async fn place_predictions(&self, request: PredictionRequest) -> PlacesResponse<Prediction> {
        match self.autocomplete(request).await {
            Ok(body) => {
                if let Some(message) = body.error_message {
                    tracing::warn!(target: TARGET, status = %body.status, %message, "autocomplete reported an error");
                }
                tracing::debug!(target: TARGET, status = %body.status, count = body.predictions.len(), "predictions received");
                PlacesResponse {
                    results: body.predictions,
                    status: body.status,
                }
            }
            Err(e) => {
                tracing::warn!(target: TARGET, error = %e, "autocomplete request failed");
                PlacesResponse::empty(ServiceStatus::UnknownError)
            }
        }
    }

    #[tracing::instrument(skip(self, request), fields(place_id = %request.place_id), target = "horizon_geocomplete_net::places", level = "debug")]
    async fn geocode(&self, request: GeocodeRequest) -> PlacesResponse<GeocodeResult> {
        match self.geocode_place(request).await {
            Ok(body) => {
                if let Some(message) = body.error_message {
                    tracing::warn!(target: TARGET, status = %body.status, %message, "geocoding reported an error");
                }
                PlacesResponse {
                    results: body.results,
                    status: body.status,
                }
            }
            Err(e) => {
                tracing::warn!(target: TARGET, error = %e, "geocode request failed");
                PlacesResponse::empty(ServiceStatus::UnknownError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceStatus::from_code("OK"), ServiceStatus::Ok);
        assert_eq!(ServiceStatus::from_code("ZERO_RESULTS"), ServiceStatus::ZeroResults);
        assert_eq!(ServiceStatus::from_code("SOMETHING_NEW"), ServiceStatus::UnknownError);
        assert_eq!(ServiceStatus::OverQueryLimit.to_string(), "OVER_QUERY_LIMIT");
    }

    #[test]
    fn test_prediction_deserializes_with_missing_fields() {
        let json = r#"{
            "description": "Berlin, Germany",
            "place_id": "ChIJAVkDPzdOqEcRcDteW0YgIQQ",
            "structured_formatting": {
                "main_text": "Berlin",
                "main_text_matched_substrings": [{ "offset": 0, "length": 4 }],
                "secondary_text": "Germany"
            }
        }"#;
        let prediction: Prediction = serde_json::from_str(json).unwrap();

        assert_eq!(prediction.structured_formatting.main_text, "Berlin");
        assert_eq!(
            prediction.structured_formatting.main_text_matched_substrings,
            vec![MatchedSubstring::new(0, 4)]
        );
        assert!(prediction.terms.is_empty());
    }

    #[test]
    fn test_prediction_request_defaults_to_geocode() {
        let request = PredictionRequest::new("berl");
        assert_eq!(request.types, vec!["geocode".to_string()]);

        let request = request.with_types(["(cities)"]).with_region("de");
        assert_eq!(request.types, vec!["(cities)".to_string()]);
        assert_eq!(request.region.as_deref(), Some("de"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpClient::new().unwrap();
        let service = PlacesWebService::with_client(client, "key").with_base_url("http://localhost:1234/");
        assert_eq!(service.base_url(), "http://localhost:1234");
        assert_eq!(
            service.endpoint("geocode/json"),
            "http://localhost:1234/geocode/json"
        );
    }
}
