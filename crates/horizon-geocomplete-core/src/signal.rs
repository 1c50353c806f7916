//! Signal/slot notifications for Horizon Geocomplete.
//!
//! Components report what happened through [`Signal`]s: the combobox emits
//! `selected`, `changed`, `state_changed` and friends, the prediction fetcher
//! emits `results_changed`. Callers connect closures (slots) and receive a
//! reference to the emitted value.
//!
//! Slots run synchronously on the emitting thread, in connection order. The
//! slot list is snapshotted before invocation, so a slot may connect or
//! disconnect slots on the same signal without deadlocking. Changes made
//! during an emission apply from the next one.
//!
//! # Example
//!
//! ```
//! use horizon_geocomplete_core::Signal;
//!
//! let input_changed = Signal::<String>::new();
//!
//! let id = input_changed.connect(|value| {
//!     println!("query is now {value:?}");
//! });
//!
//! input_changed.emit("Berl".to_string());
//! assert!(input_changed.disconnect(id));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::SignalError;
use crate::logging::targets;

/// Identifies one slot connected to a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots notified with a shared `&Args` on every emission.
///
/// Use `()` for notifications that carry nothing.
pub struct Signal<Args> {
    slots: Mutex<Vec<(ConnectionId, Slot<Args>)>>,
    next_id: AtomicU64,
    blocked: AtomicBool,
    emissions: AtomicU64,
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An unconnected signal.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
            emissions: AtomicU64::new(0),
        }
    }

    /// Append `slot`; it runs after every slot connected before it.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(slot)));
        id
    }

    /// Connect `slot` for as long as the returned guard lives.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: self,
        }
    }

    /// Remove the slot connected under `id`. Returns `false` if there was none.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.lock();
        match slots.iter().position(|(slot_id, _)| *slot_id == id) {
            Some(index) => {
                slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Like [`disconnect`](Self::disconnect), but unknown ids are an error.
    pub fn try_disconnect(&self, id: ConnectionId) -> Result<(), SignalError> {
        self.disconnect(id)
            .then_some(())
            .ok_or(SignalError::InvalidConnection)
    }

    /// Remove every slot.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Suppress emissions until unblocked.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::Release);
    }

    /// Whether emissions are suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Number of emissions that reached the slots (blocked emits excluded).
    pub fn emit_count(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    /// Call every connected slot with `args`, in connection order.
    #[tracing::instrument(skip_all, target = "horizon_geocomplete_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked, emission dropped");
            return;
        }

        let snapshot: Vec<Slot<Args>> = self
            .slots
            .lock()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        self.emissions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emit");

        for slot in &snapshot {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.lock().len())
            .field("blocked", &self.blocked.load(Ordering::Acquire))
            .finish()
    }
}

/// Disconnects its slot when dropped. Created by [`Signal::connect_scoped`].
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use horizon_geocomplete_core::Signal;
///
/// let opened = Signal::<bool>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// {
///     let seen = Arc::clone(&seen);
///     let _guard = opened.connect_scoped(move |_| {
///         seen.fetch_add(1, Ordering::SeqCst);
///     });
///     opened.emit(true);
/// }
/// opened.emit(false);
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    /// The guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}
