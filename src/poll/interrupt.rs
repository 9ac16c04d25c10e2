//! Externally settable interrupt flag shared across a pipeline run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Default)]
struct InterruptState {
    raised: AtomicBool,
    notify: Notify,
}

/// Cloneable handle to a one-way interrupt flag.
///
/// Any clone may raise the flag; every clone observes it. Waiters parked in
/// [`InterruptFlag::raised`] wake as soon as it is raised.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag {
    inner: Arc<InterruptState>,
}

impl InterruptFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes every waiter.
    pub fn interrupt(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns whether the flag has been raised.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Completes once the flag is raised.
    pub async fn raised(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_interrupted() {
                return;
            }
            notified.await;
        }
    }

    /// Raises the flag when the process receives Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn interrupt_on_ctrl_c(&self) -> JoinHandle<()> {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(target: "nova_machine::poll", "interrupt received");
                flag.interrupt();
            }
        })
    }
}
