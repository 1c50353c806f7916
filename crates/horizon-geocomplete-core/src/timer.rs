//! Timer system for Horizon Geocomplete.
//!
//! Provides one-shot timers driven by the host event loop. Components own a
//! [`TimerManager`], start timers against a [`Clock`] and let the host call
//! `process_expired` whenever it wakes up. Expired timer IDs are returned to
//! the component, which decides what each one means.
//!
//! The clock is injectable so tests can advance time deterministically with
//! [`ManualClock`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::error::TimerError;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// Source of the current time for timers.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// A clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a manual clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData {
    fire_time: Instant,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Manages the one-shot timers of a single component.
pub struct TimerManager {
    clock: Arc<dyn Clock>,
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerManager {
    /// Create a timer manager on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a timer manager on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// The clock this manager reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current time according to the manager's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Start a one-shot timer that fires after the specified duration.
    pub fn start_one_shot(&mut self, duration: Duration) -> TimerId {
        let fire_time = self.clock.now() + duration;
        let id = self.timers.insert(TimerData { fire_time });
        self.queue.push(TimerQueueEntry { id, fire_time });
        tracing::trace!(target: targets::TIMER, ?id, ?duration, "timer started");
        id
    }

    /// Stop and remove a timer.
    pub fn stop(&mut self, id: TimerId) -> Result<(), TimerError> {
        if self.timers.remove(id).is_some() {
            tracing::trace!(target: targets::TIMER, ?id, "timer stopped");
            Ok(())
        } else {
            Err(TimerError::InvalidTimerId)
        }
    }

    /// Stop every pending timer.
    pub fn stop_all(&mut self) {
        if !self.timers.is_empty() {
            crate::geocomplete_debug!(cancelled = self.timers.len(), "stopping all timers");
        }
        self.timers.clear();
        self.queue.clear();
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration until the next timer fires, if any.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.drop_stale_entries();
        let now = self.clock.now();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Remove and return every timer whose fire time has passed, in fire order.
    #[tracing::instrument(skip(self), target = "horizon_geocomplete_core::timer", level = "trace")]
    pub fn process_expired(&mut self) -> Vec<TimerId> {
        let now = self.clock.now();
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            // Stopped timers leave their queue entry behind.
            if self
                .timers
                .get(entry.id)
                .is_some_and(|t| t.fire_time == entry.fire_time)
            {
                self.timers.remove(entry.id);
                tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
                fired.push(entry.id);
            }
        }

        fired
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    fn drop_stale_entries(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("active", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (ManualClock, TimerManager) {
        let clock = ManualClock::new();
        let timers = TimerManager::with_clock(Arc::new(clock.clone()));
        (clock, timers)
    }

    #[test]
    fn test_one_shot_fires_once() {
        let (clock, mut timers) = manager();
        let id = timers.start_one_shot(Duration::from_millis(100));

        clock.advance(Duration::from_millis(99));
        assert!(timers.process_expired().is_empty());

        clock.advance(Duration::from_millis(1));
        assert_eq!(timers.process_expired(), vec![id]);
        assert!(timers.process_expired().is_empty());
        assert!(!timers.is_active(id));
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let (clock, mut timers) = manager();
        let id = timers.start_one_shot(Duration::from_millis(10));
        timers.stop(id).unwrap();

        clock.advance(Duration::from_millis(50));
        assert!(timers.process_expired().is_empty());
        assert_eq!(timers.stop(id), Err(TimerError::InvalidTimerId));
    }

    #[test]
    fn test_expired_in_fire_order() {
        let (clock, mut timers) = manager();
        let late = timers.start_one_shot(Duration::from_millis(30));
        let early = timers.start_one_shot(Duration::from_millis(10));

        clock.advance(Duration::from_millis(40));
        assert_eq!(timers.process_expired(), vec![early, late]);
    }

    #[test]
    fn test_time_until_next_skips_stopped() {
        let (_clock, mut timers) = manager();
        let first = timers.start_one_shot(Duration::from_millis(10));
        timers.start_one_shot(Duration::from_millis(25));
        timers.stop(first).unwrap();

        assert_eq!(timers.time_until_next(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn test_stop_all() {
        let (clock, mut timers) = manager();
        timers.start_one_shot(Duration::from_millis(1));
        timers.start_one_shot(Duration::from_millis(2));
        timers.stop_all();

        clock.advance(Duration::from_secs(1));
        assert_eq!(timers.active_count(), 0);
        assert!(timers.process_expired().is_empty());
        assert_eq!(timers.time_until_next(), None);
    }

    struct EventTargets(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventTargets {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_events_use_named_targets() {
        use tracing_subscriber::layer::SubscriberExt;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(EventTargets(seen.clone()));
        let _default = tracing::subscriber::set_default(subscriber);

        let (clock, mut timers) = manager();
        let id = timers.start_one_shot(Duration::from_millis(5));
        timers.stop(id).unwrap();
        timers.start_one_shot(Duration::from_millis(5));
        clock.advance(Duration::from_millis(5));
        timers.process_expired();
        timers.start_one_shot(Duration::from_millis(5));
        timers.stop_all();

        let seen = seen.lock();
        assert_eq!(seen.iter().filter(|t| *t == targets::TIMER).count(), 5);
        assert_eq!(seen.iter().filter(|t| *t == targets::CORE).count(), 1);
        assert_eq!(seen.len(), 6);
    }
}
