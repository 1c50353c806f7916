//! Assistive-technology status announcements.
//!
//! After each render settles, the combobox hands the announcer a snapshot of
//! what a screen reader cares about. When the snapshot differs from the last
//! one, a debounce timer is (re)started; when it fires the message is computed
//! from the state at that moment and published if it changed.

use std::time::Duration;

use horizon_geocomplete_core::logging::targets;
use horizon_geocomplete_core::{Debouncer, TimerId, TimerManager};

/// Default coalescing window for announcements.
pub const DEFAULT_STATUS_DEBOUNCE: Duration = Duration::from_millis(200);

/// Inputs to a status message formatter.
pub struct StatusContext<'a, T> {
    /// Whether the menu is open.
    pub is_open: bool,
    /// The highlighted item, if any.
    pub highlighted_item: Option<&'a T>,
    /// The selected item, if any.
    pub selected_item: Option<&'a T>,
    /// Number of items in the menu.
    pub result_count: usize,
    /// Result count at the previous announcement.
    pub previous_result_count: usize,
    /// The configured item-to-string conversion.
    pub item_to_string: &'a dyn Fn(&T) -> String,
}

/// The default announcement.
pub fn default_status_message<T>(ctx: &StatusContext<'_, T>) -> String {
    if !ctx.is_open {
        return ctx
            .selected_item
            .map(|item| (ctx.item_to_string)(item))
            .unwrap_or_default();
    }
    if ctx.result_count == 0 {
        return "No results.".to_string();
    }
    match ctx.highlighted_item {
        Some(item) if ctx.result_count == ctx.previous_result_count => (ctx.item_to_string)(item),
        _ => {
            let noun = if ctx.result_count == 1 {
                "result is"
            } else {
                "results are"
            };
            format!(
                "{} {} available, use up and down arrow keys to navigate.",
                ctx.result_count, noun
            )
        }
    }
}

/// The state an announcement depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Whether the menu is open.
    pub is_open: bool,
    /// Highlighted index.
    pub highlighted_index: Option<usize>,
    /// Number of items.
    pub result_count: usize,
}

/// Debounced announcer state owned by a combobox.
#[derive(Debug)]
pub struct StatusAnnouncer {
    debouncer: Debouncer,
    last_snapshot: Option<StatusSnapshot>,
    previous_result_count: usize,
    message: String,
}

impl StatusAnnouncer {
    /// Create an announcer with the given coalescing window.
    pub fn new(window: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            last_snapshot: None,
            previous_result_count: 0,
            message: String::new(),
        }
    }

    /// The current announcement.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Result count recorded at the last announcement.
    pub fn previous_result_count(&self) -> usize {
        self.previous_result_count
    }

    /// Whether an announcement is scheduled.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Record a settled snapshot, scheduling an announcement if it changed.
    ///
    /// Returns `true` when a timer was (re)started.
    pub fn observe(&mut self, snapshot: StatusSnapshot, timers: &mut TimerManager) -> bool {
        if self.last_snapshot == Some(snapshot) {
            return false;
        }
        self.last_snapshot = Some(snapshot);
        self.debouncer.trigger(timers);
        tracing::trace!(
            target: targets::STATUS,
            is_open = snapshot.is_open,
            highlighted_index = ?snapshot.highlighted_index,
            result_count = snapshot.result_count,
            "status announcement scheduled"
        );
        true
    }

    /// Claim a fired timer. Returns `true` if it was the announcement timer.
    pub fn claim(&mut self, fired: TimerId) -> bool {
        self.debouncer.claim(fired)
    }

    /// Publish a computed message.
    ///
    /// Returns the message when it differs from the previous announcement.
    pub fn publish(&mut self, message: String, result_count: usize) -> Option<String> {
        self.previous_result_count = result_count;
        if message == self.message {
            return None;
        }
        tracing::debug!(target: targets::STATUS, %message, "status announced");
        self.message = message.clone();
        Some(message)
    }

    /// Cancel any scheduled announcement.
    pub fn cancel(&mut self, timers: &mut TimerManager) {
        self.debouncer.cancel(timers);
    }
}
