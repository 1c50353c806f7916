//! Where background network work runs.
//!
//! Work is spawned on the caller's tokio runtime when there is one, and on a
//! lazily created shared runtime otherwise (for hosts that drive the UI from
//! a plain event loop).

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

static SHARED: OnceLock<Runtime> = OnceLock::new();

/// The shared fallback runtime, created on first use.
pub fn shared() -> &'static Runtime {
    SHARED.get_or_init(|| {
        Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("geocomplete-io")
            .enable_all()
            .build()
            .expect("failed to start the geocomplete I/O runtime")
    })
}

/// Spawn `future` on the ambient runtime, or on [`shared`] outside of one.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(ambient) => ambient.spawn(future),
        Err(_) => shared().spawn(future),
    }
}
