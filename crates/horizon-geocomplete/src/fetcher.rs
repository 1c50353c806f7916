//! Debounced prediction fetching.
//!
//! [`PredictionFetcher`] turns input text into [`Suggestion`]s. Queries at or
//! below the length threshold are ignored; the rest are debounced (last call
//! wins) and sent to a [`PlacesApi`]. Results land in a shared [`FetchState`]
//! and are announced through `results_changed`, so the host knows to render
//! again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use horizon_geocomplete_core::Signal;
use horizon_geocomplete_core::logging::{span_names, targets};
use horizon_geocomplete_net::AsyncDebouncer;
use horizon_geocomplete_net::places::{
    GEOCODE_TYPE, PlacesApi, PlacesResponse, Prediction, PredictionRequest, ServiceStatus,
};
use parking_lot::Mutex;
use tracing::Instrument;

use crate::suggestion::Suggestion;

/// Default quiet interval before a query is sent.
pub const DEFAULT_FETCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Fetch behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Queries with this many characters or fewer are not sent.
    pub min_length: usize,
    /// Quiet interval before a query is sent.
    pub debounce: Duration,
    /// Place type filter.
    pub types: Vec<String>,
    /// Result language.
    pub language: Option<String>,
    /// Region bias.
    pub region: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            min_length: 0,
            debounce: DEFAULT_FETCH_DEBOUNCE,
            types: vec![GEOCODE_TYPE.to_string()],
            language: None,
            region: None,
        }
    }
}

impl FetchOptions {
    /// Set the length threshold.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Set the quiet interval.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Replace the place type filter.
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

    /// Whether `query` is long enough to send.
    pub fn accepts(&self, query: &str) -> bool {
        query.chars().count() > self.min_length
    }

    /// Build the request for `query`.
    pub fn request(&self, query: &str) -> PredictionRequest {
        let mut request = PredictionRequest::new(query).with_types(self.types.iter().cloned());
        if let Some(language) = &self.language {
            request = request.with_language(language.clone());
        }
        if let Some(region) = &self.region {
            request = request.with_region(region.clone());
        }
        request
    }
}

/// The last committed fetch result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchState {
    /// Suggestions from the last successful fetch.
    pub suggestions: Vec<Suggestion>,
    /// Whether the last fetch reported a non-OK status.
    pub error: bool,
    /// Status of the last fetch; `None` before the first one completes.
    pub status: Option<ServiceStatus>,
}

impl FetchState {
    fn from_response(response: PlacesResponse<Prediction>) -> Self {
        if response.is_ok() {
            Self {
                suggestions: response.results.iter().map(Suggestion::from).collect(),
                error: false,
                status: Some(response.status),
            }
        } else {
            Self {
                suggestions: Vec::new(),
                error: true,
                status: Some(response.status),
            }
        }
    }
}

struct Shared {
    state: Mutex<FetchState>,
    alive: AtomicBool,
    results_changed: Signal<FetchState>,
}

impl Shared {
    fn commit(&self, query: &str, response: PlacesResponse<Prediction>) {
        if !self.alive.load(Ordering::Acquire) {
            tracing::debug!(target: targets::FETCHER, query, "result dropped after unmount");
            return;
        }

        let next = FetchState::from_response(response);
        if next.error {
            tracing::warn!(
                target: targets::FETCHER,
                query,
                status = ?next.status,
                "prediction request failed"
            );
        } else {
            tracing::debug!(
                target: targets::FETCHER,
                query,
                count = next.suggestions.len(),
                "predictions received"
            );
        }

        *self.state.lock() = next.clone();
        self.results_changed.emit(next);
    }
}

/// Debounced prediction fetcher.
pub struct PredictionFetcher<P: PlacesApi> {
    api: Arc<P>,
    options: FetchOptions,
    shared: Arc<Shared>,
    debouncer: AsyncDebouncer,
}

impl<P: PlacesApi> PredictionFetcher<P> {
    /// Create a fetcher.
    pub fn new(api: P, options: FetchOptions) -> Self {
        Self::with_shared_api(Arc::new(api), options)
    }

    /// Create a fetcher over an API shared with other components.
    pub fn with_shared_api(api: Arc<P>, options: FetchOptions) -> Self {
        Self {
            debouncer: AsyncDebouncer::new(options.debounce),
            api,
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(FetchState::default()),
                alive: AtomicBool::new(true),
                results_changed: Signal::new(),
            }),
        }
    }

    /// The API.
    pub fn api(&self) -> &Arc<P> {
        &self.api
    }

    /// The fetch options.
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Signal emitted with every committed result.
    pub fn results_changed(&self) -> &Signal<FetchState> {
        &self.shared.results_changed
    }

    /// A copy of the last committed result.
    pub fn state(&self) -> FetchState {
        self.shared.state.lock().clone()
    }

    /// The current suggestions.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.shared.state.lock().suggestions.clone()
    }

    /// Whether the last fetch failed.
    pub fn has_error(&self) -> bool {
        self.shared.state.lock().error
    }

    /// Whether a fetch is scheduled or in flight.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Whether the fetcher is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    /// Schedule a fetch for `query`.
    ///
    /// Returns `false` when the query is too short or the fetcher is
    /// unmounted. A scheduled fetch replaces any earlier one that has not
    /// committed yet. A too-short query also cancels the earlier fetch and
    /// drops results left over from a longer query.
    #[tracing::instrument(skip(self), target = "horizon_geocomplete::fetcher", level = "debug")]
    pub fn fetch(&self, query: &str) -> bool {
        if !self.is_mounted() {
            return false;
        }
        if !self.options.accepts(query) {
            tracing::trace!(
                target: targets::FETCHER,
                min_length = self.options.min_length,
                "query below threshold"
            );
            if *self.shared.state.lock() == FetchState::default() {
                self.debouncer.cancel();
            } else {
                self.clear();
            }
            return false;
        }

        let api = self.api.clone();
        let shared = self.shared.clone();
        let request = self.options.request(query);
        let span = tracing::debug_span!(target: targets::FETCHER, span_names::FETCH, query);
        let query = query.to_string();

        self.debouncer.call(move || {
            async move {
                let response = api.place_predictions(request).await;
                shared.commit(&query, response);
            }
            .instrument(span)
        });
        true
    }

    /// Cancel any pending fetch and drop the current results.
    pub fn clear(&self) {
        self.debouncer.cancel();
        let cleared = FetchState::default();
        *self.shared.state.lock() = cleared.clone();
        if self.is_mounted() {
            self.shared.results_changed.emit(cleared);
        }
    }

    /// Cancel any pending fetch and refuse further work.
    pub fn unmount(&self) {
        if self.shared.alive.swap(false, Ordering::AcqRel) {
            self.debouncer.cancel();
            tracing::debug!(target: targets::FETCHER, "fetcher unmounted");
        }
    }
}

impl<P: PlacesApi> Drop for PredictionFetcher<P> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<P: PlacesApi> std::fmt::Debug for PredictionFetcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionFetcher")
            .field("options", &self.options)
            .field("state", &*self.shared.state.lock())
            .field("alive", &self.is_mounted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use horizon_geocomplete_net::places::{GeocodeRequest, GeocodeResult, MatchedSubstring};

    use super::*;

    #[derive(Default)]
    struct StaticApi {
        requests: Mutex<Vec<PredictionRequest>>,
        status: Option<ServiceStatus>,
    }

    impl PlacesApi for StaticApi {
        fn place_predictions(
            &self,
            request: PredictionRequest,
        ) -> impl Future<Output = PlacesResponse<Prediction>> + Send {
            self.requests.lock().push(request.clone());
            let response = match self.status {
                Some(status) => PlacesResponse::empty(status),
                None => {
                    let mut prediction = Prediction {
                        description: format!("{}, Germany", request.input),
                        place_id: "p1".to_string(),
                        ..Default::default()
                    };
                    prediction.structured_formatting.main_text = request.input.clone();
                    prediction
                        .structured_formatting
                        .main_text_matched_substrings
                        .push(MatchedSubstring::new(0, request.input.encode_utf16().count()));
                    PlacesResponse::ok(vec![prediction])
                }
            };
            async move { response }
        }

        fn geocode(
            &self,
            _request: GeocodeRequest,
        ) -> impl Future<Output = PlacesResponse<GeocodeResult>> + Send {
            async { PlacesResponse::empty(ServiceStatus::NotFound) }
        }
    }

    #[test]
    fn test_options_threshold_counts_chars() {
        let options = FetchOptions::default().with_min_length(2);
        assert!(!options.accepts("be"));
        assert!(!options.accepts("üb"));
        assert!(options.accepts("ber"));
        assert!(FetchOptions::default().accepts("b"));
        assert!(!FetchOptions::default().accepts(""));
    }

    #[test]
    fn test_request_carries_filters() {
        let request = FetchOptions::default()
            .with_language("de")
            .with_region("de")
            .request("berl");
        assert_eq!(request.input, "berl");
        assert_eq!(request.types, vec!["geocode".to_string()]);
        assert_eq!(request.language.as_deref(), Some("de"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_commits_suggestions() {
        let fetcher = PredictionFetcher::new(StaticApi::default(), FetchOptions::default());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        fetcher
            .results_changed()
            .connect(move |state| sink.lock().push(state.clone()));

        assert!(fetcher.fetch("Berl"));
        tokio::time::sleep(Duration::from_millis(250)).await;

        let state = fetcher.state();
        assert!(!state.error);
        assert_eq!(state.status, Some(ServiceStatus::Ok));
        assert_eq!(state.suggestions[0].main_markup, "<strong>Berl</strong>");
        assert_eq!(received.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_ok_status_sets_error() {
        let api = StaticApi {
            status: Some(ServiceStatus::ZeroResults),
            ..Default::default()
        };
        let fetcher = PredictionFetcher::new(api, FetchOptions::default());
        fetcher.fetch("zzzz");
        tokio::time::sleep(Duration::from_millis(250)).await;

        let state = fetcher.state();
        assert!(state.error);
        assert!(state.suggestions.is_empty());
        assert_eq!(state.status, Some(ServiceStatus::ZeroResults));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_discards_pending_fetch() {
        let fetcher = PredictionFetcher::new(StaticApi::default(), FetchOptions::default());
        fetcher.fetch("Berl");
        fetcher.unmount();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(fetcher.api().requests.lock().is_empty());
        assert_eq!(fetcher.state(), FetchState::default());
        assert!(!fetcher.fetch("Berlin"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_results() {
        let fetcher = PredictionFetcher::new(StaticApi::default(), FetchOptions::default());
        fetcher.fetch("Berl");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fetcher.suggestions().len(), 1);

        fetcher.clear();
        assert!(fetcher.suggestions().is_empty());
        assert!(!fetcher.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_cancels_earlier_fetch() {
        let options = FetchOptions::default().with_min_length(2);
        let fetcher = PredictionFetcher::new(StaticApi::default(), options);

        assert!(fetcher.fetch("berl"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!fetcher.fetch("be"));
        assert!(!fetcher.is_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(fetcher.api().requests.lock().is_empty());
        assert_eq!(fetcher.state(), FetchState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_drops_stale_results() {
        let options = FetchOptions::default().with_min_length(2);
        let fetcher = PredictionFetcher::new(StaticApi::default(), options);
        let emitted = Arc::new(Mutex::new(0));
        let sink = emitted.clone();
        fetcher.results_changed().connect(move |_| *sink.lock() += 1);

        fetcher.fetch("berl");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fetcher.suggestions().len(), 1);

        fetcher.fetch("be");
        assert!(fetcher.suggestions().is_empty());
        fetcher.fetch("b");
        assert_eq!(*emitted.lock(), 2);
    }
}
