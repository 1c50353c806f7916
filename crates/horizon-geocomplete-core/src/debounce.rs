//! Debouncing on top of the timer queue.
//!
//! A [`Debouncer`] collapses rapid repeated triggers into one timer that fires
//! after a quiet interval. Each `trigger` stops the previous timer and starts
//! a fresh one, so the last call wins.

use std::time::Duration;

use crate::timer::{TimerId, TimerManager};

/// A cancellable, last-call-wins debounce handle.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<TimerId>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet interval.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// The quiet interval.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the quiet interval, cancelling any pending timer.
    pub fn trigger(&mut self, timers: &mut TimerManager) -> TimerId {
        if let Some(previous) = self.pending.take() {
            let _ = timers.stop(previous);
        }
        let id = timers.start_one_shot(self.window);
        crate::geocomplete_trace!(?id, window = ?self.window, "debounce restarted");
        self.pending = Some(id);
        id
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self, timers: &mut TimerManager) {
        if let Some(previous) = self.pending.take() {
            crate::geocomplete_trace!(id = ?previous, "debounce cancelled");
            let _ = timers.stop(previous);
        }
    }

    /// Whether a timer is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Claim a fired timer.
    ///
    /// Returns `true` when `fired` is this debouncer's pending timer, which is
    /// then considered consumed.
    pub fn claim(&mut self, fired: TimerId) -> bool {
        if self.pending == Some(fired) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
