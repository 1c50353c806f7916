//! Async debouncing on the tokio runtime.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::runtime;

/// A last-call-wins debouncer for async work.
///
/// Each [`call`](Self::call) aborts the previously scheduled task (whether it
/// is still sleeping or already running) and schedules the new one after the
/// quiet interval. Dropping the debouncer aborts whatever is pending.
#[derive(Debug)]
pub struct AsyncDebouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncDebouncer {
    /// Create a debouncer with the given quiet interval.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    /// The quiet interval.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `work` to run once the quiet interval elapses without another call.
    pub fn call<F, Fut>(&self, work: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let handle = runtime::spawn(async move {
            tokio::time::sleep(window).await;
            work().await;
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Abort the pending task, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    /// Whether a scheduled task has not yet finished.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for AsyncDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
