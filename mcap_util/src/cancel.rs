use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Clone, Debug, Default)]
pub struct AtomicCancellation {
    value: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AtomicCancellation {
    pub fn new() -> AtomicCancellation {
        AtomicCancellation {
            value: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    pub fn can_continue(&self) -> bool {
        !self.is_cancelled()
    }

    /// Safe to call from outside the runtime, e.g. a signal handler thread.
    pub fn cancel(&self) {
        self.value.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel cannot be missed
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
