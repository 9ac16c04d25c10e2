//! User-facing notices emitted while lifecycle actions run.

use tracing::info;

/// Notice shown before a server is deleted.
pub const DELETING_SERVER: &str = "Deleting server...";
/// Notice shown before a server is rebooted.
pub const REBOOTING_SERVER: &str = "Rebooting server...";
/// Notice shown while waiting for the transport after a reboot.
pub const WAITING_FOR_SSH: &str = "Waiting for SSH to become available...";

/// Fire-and-forget sink for informational messages.
pub trait UserNotifier: Send + Sync {
    /// Presents `message` to the user.
    fn info(&self, message: &str);
}

/// Emits notices as `tracing` events on the `nova_machine::ui` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl UserNotifier for TracingNotifier {
    fn info(&self, message: &str) {
        info!(target: "nova_machine::ui", "{message}");
    }
}
