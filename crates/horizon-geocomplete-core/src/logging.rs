//! Logging facilities for Horizon Geocomplete.
//!
//! Horizon Geocomplete uses the `tracing` crate for instrumentation. To see
//! logs, install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_geocomplete=debug,horizon_geocomplete_net=info")
//!         .init();
//! }
//! ```

/// Span names used throughout Horizon Geocomplete for tracing.
pub mod span_names {
    /// State update span.
    pub const STATE_UPDATE: &str = "horizon_geocomplete::state_update";
    /// Event dispatch span.
    pub const DISPATCH: &str = "horizon_geocomplete::dispatch";
    /// Prediction fetch span.
    pub const FETCH: &str = "horizon_geocomplete::fetch";
    /// Script load span.
    pub const LOAD: &str = "horizon_geocomplete::load";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core systems target.
    pub const CORE: &str = "horizon_geocomplete_core";
    /// Timer system target.
    pub const TIMER: &str = "horizon_geocomplete_core::timer";
    /// Signal system target.
    pub const SIGNAL: &str = "horizon_geocomplete_core::signal";
    /// Combobox state machine target.
    pub const COMBOBOX: &str = "horizon_geocomplete::combobox";
    /// Status announcer target.
    pub const STATUS: &str = "horizon_geocomplete::status";
    /// Prediction fetcher target.
    pub const FETCHER: &str = "horizon_geocomplete::fetcher";
    /// Settings target.
    pub const SETTINGS: &str = "horizon_geocomplete::settings";
    /// Loader service target.
    pub const LOADER: &str = "horizon_geocomplete_net::loader";
    /// HTTP client target.
    pub const HTTP: &str = "horizon_geocomplete_net::http";
    /// Performance span target.
    pub const PERF: &str = "horizon_geocomplete::perf";
    /// Places web service target.
    pub const PLACES: &str = "horizon_geocomplete_net::places";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level log under the core target.
#[macro_export]
macro_rules! geocomplete_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}

/// Debug-level log under the core target.
#[macro_export]
macro_rules! geocomplete_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}
