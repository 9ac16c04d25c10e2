//! Compute gateway abstraction consumed by the lifecycle actions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::server::ServerRecord;

/// Future returned by gateway operations.
pub type GatewayFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Reboot flavour requested from the provider.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RebootMode {
    /// Graceful reboot through the guest operating system.
    #[default]
    Soft,
    /// Power-cycle the instance.
    Hard,
}

impl RebootMode {
    /// Wire name used by compute APIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "SOFT",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for RebootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal interface over a compute API.
///
/// Implementations report provider failures through their own error type;
/// callers never reinterpret those errors. A server that does not exist is
/// not an error: [`CloudServerGateway::get_server`] returns `Ok(None)`.
pub trait CloudServerGateway: Send + Sync {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches a single server by identifier.
    fn get_server<'a>(
        &'a self,
        id: &'a str,
    ) -> GatewayFuture<'a, Option<ServerRecord>, Self::Error>;

    /// Lists every server visible to the configured credentials.
    fn list_servers(&self) -> GatewayFuture<'_, Vec<ServerRecord>, Self::Error>;

    /// Requests deletion of a server.
    fn destroy_server<'a>(&'a self, id: &'a str) -> GatewayFuture<'a, (), Self::Error>;

    /// Requests a reboot of a server.
    fn reboot_server<'a>(
        &'a self,
        id: &'a str,
        mode: RebootMode,
    ) -> GatewayFuture<'a, (), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::RebootMode;

    #[test]
    fn reboot_mode_defaults_to_soft() {
        assert_eq!(RebootMode::default(), RebootMode::Soft);
        assert_eq!(RebootMode::Hard.to_string(), "HARD");
    }
}
