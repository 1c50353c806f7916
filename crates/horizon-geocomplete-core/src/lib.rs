//! Core systems for Horizon Geocomplete.
//!
//! This crate provides the foundational pieces the autocomplete components
//! are built from:
//!
//! - **Signal/Slot System**: Type-safe notifications for state changes
//! - **Timers**: One-shot timers driven by the host event loop, on an injectable clock
//! - **Debouncing**: Last-call-wins timer handles
//! - **Logging**: `tracing` targets, span names and helper macros
//!
//! # Signal Example
//!
//! ```
//! use horizon_geocomplete_core::Signal;
//!
//! let selected = Signal::<Option<String>>::new();
//! let conn_id = selected.connect(|item| {
//!     println!("Selected: {:?}", item);
//! });
//!
//! selected.emit(Some("Berlin, Germany".to_string()));
//! selected.disconnect(conn_id);
//! ```
//!
//! # Debounce Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_geocomplete_core::{Debouncer, ManualClock, TimerManager};
//!
//! let clock = ManualClock::new();
//! let mut timers = TimerManager::with_clock(Arc::new(clock.clone()));
//! let mut debouncer = Debouncer::new(Duration::from_millis(200));
//!
//! debouncer.trigger(&mut timers);
//! clock.advance(Duration::from_millis(100));
//! let id = debouncer.trigger(&mut timers);
//! clock.advance(Duration::from_millis(200));
//!
//! assert_eq!(timers.process_expired(), vec![id]);
//! ```

mod debounce;
mod error;
pub mod logging;
pub mod signal;
mod timer;

pub use debounce::Debouncer;
pub use error::{SignalError, TimerError};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use timer::{Clock, ManualClock, SystemClock, TimerId, TimerManager};
