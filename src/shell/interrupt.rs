//! User cancellation of a running plugin.
//!
//! A run registers a fresh [`CancellationToken`] for its duration. Ctrl-C is
//! delivered to whichever run is active; with no active run it is ignored.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shared slot holding the token of the active run, if any.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run and return its token.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    /// Forget the active run.
    pub fn finish(&self) {
        self.slot().take();
    }

    /// Cancel the active run. Returns false when nothing was running.
    pub fn interrupt(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) => {
                debug!("Interrupting active run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        // The slot only holds a token; a poisoned lock leaves it usable.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Route Ctrl-C to `handle` for the rest of the process.
///
/// When no plugin is running the keypress only prints a reminder, so the
/// console is left with `quit` or end-of-input.
pub fn spawn_ctrl_c_listener(handle: InterruptHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.interrupt() {
                eprintln!();
                eprintln!("(type 'quit' to exit)");
            }
        }
    })
}
