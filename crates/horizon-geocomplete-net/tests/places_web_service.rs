//! Places web service tests against a mock server.

use horizon_geocomplete_net::http::HttpClient;
use horizon_geocomplete_net::places::{
    GeocodeRequest, MatchedSubstring, PlacesApi, PlacesWebService, PredictionRequest,
    ServiceStatus,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> PlacesWebService {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    PlacesWebService::with_client(HttpClient::new().unwrap(), "test-key").with_base_url(server.uri())
}

#[tokio::test]
async fn test_predictions_request_and_parse() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/autocomplete/json"))
        .and(query_param("input", "berl"))
        .and(query_param("types", "geocode"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{
                "description": "Berlin, Germany",
                "place_id": "ChIJAVkDPzdOqEcRcDteW0YgIQQ",
                "matched_substrings": [{ "offset": 0, "length": 4 }],
                "structured_formatting": {
                    "main_text": "Berlin",
                    "main_text_matched_substrings": [{ "offset": 0, "length": 4 }],
                    "secondary_text": "Germany"
                },
                "terms": [
                    { "offset": 0, "value": "Berlin" },
                    { "offset": 8, "value": "Germany" }
                ],
                "types": ["locality", "political", "geocode"]
            }],
            "status": "OK"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .place_predictions(PredictionRequest::new("berl"))
        .await;

    assert_eq!(response.status, ServiceStatus::Ok);
    assert_eq!(response.results.len(), 1);
    let prediction = &response.results[0];
    assert_eq!(prediction.description, "Berlin, Germany");
    assert_eq!(prediction.structured_formatting.secondary_text, "Germany");
    assert_eq!(
        prediction.structured_formatting.main_text_matched_substrings,
        vec![MatchedSubstring::new(0, 4)]
    );
    assert_eq!(prediction.terms.len(), 2);
}

#[tokio::test]
async fn test_language_and_region_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/autocomplete/json"))
        .and(query_param("language", "de"))
        .and(query_param("region", "at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [],
            "status": "ZERO_RESULTS"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .with_language("de")
        .place_predictions(PredictionRequest::new("xyzzy").with_region("at"))
        .await;

    assert_eq!(response.status, ServiceStatus::ZeroResults);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_request_denied_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/autocomplete/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .mount(&server)
        .await;

    let response = service(&server)
        .place_predictions(PredictionRequest::new("berl"))
        .await;

    assert_eq!(response.status, ServiceStatus::RequestDenied);
    assert!(!response.is_ok());
}

#[tokio::test]
async fn test_http_error_maps_to_unknown_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/autocomplete/json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let response = service(&server)
        .place_predictions(PredictionRequest::new("berl"))
        .await;

    assert_eq!(response.status, ServiceStatus::UnknownError);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_malformed_body_maps_to_unknown_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/autocomplete/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let response = service(&server)
        .place_predictions(PredictionRequest::new("berl"))
        .await;

    assert_eq!(response.status, ServiceStatus::UnknownError);
}

#[tokio::test]
async fn test_geocode_place_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode/json"))
        .and(query_param("place_id", "ChIJAVkDPzdOqEcRcDteW0YgIQQ"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "formatted_address": "Berlin, Germany",
                "place_id": "ChIJAVkDPzdOqEcRcDteW0YgIQQ",
                "geometry": {
                    "location": { "lat": 52.52, "lng": 13.405 },
                    "location_type": "APPROXIMATE"
                },
                "address_components": [
                    { "long_name": "Berlin", "short_name": "Berlin", "types": ["locality"] }
                ],
                "types": ["locality", "political"]
            }],
            "status": "OK"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .geocode(GeocodeRequest::new("ChIJAVkDPzdOqEcRcDteW0YgIQQ"))
        .await;

    assert!(response.is_ok());
    let result = &response.results[0];
    assert_eq!(result.formatted_address, "Berlin, Germany");
    assert!((result.geometry.location.lat - 52.52).abs() < 1e-9);
    assert_eq!(result.address_components[0].short_name, "Berlin");
}

#[tokio::test]
async fn test_unreachable_host_maps_to_unknown_error() {
    let service = PlacesWebService::with_client(HttpClient::new().unwrap(), "test-key")
        .with_base_url("http://127.0.0.1:9");

    let response = service.geocode(GeocodeRequest::new("anything")).await;
    assert_eq!(response.status, ServiceStatus::UnknownError);
}
