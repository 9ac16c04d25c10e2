//! Address resolution for reaching an instance.
//!
//! The guest side picks one address from a [`ServerRecord`] in a fixed
//! priority order: an explicit network, then an explicit address slot (or the
//! floating IP sentinel), then auto-discovery over the public and private
//! buckets. A missing explicit network or slot degrades to auto-discovery
//! rather than failing. The host side uses an explicit override or the first
//! private IPv4 address of the local machine.

mod host;

use thiserror::Error;
use tracing::debug;

use crate::server::ServerRecord;

pub use host::{InterfaceLister, SystemInterfaces};

/// Address slot value that selects the caller supplied floating IP.
pub const FLOATING_IP_SENTINEL: &str = "floating_ip";

const RESOLVE_TARGET: &str = "nova_machine::resolve";

/// Errors raised while resolving host or guest addresses.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    /// Every resolution path was exhausted without finding an address.
    #[error("no valid host address could be found for server {server_id}")]
    NoValidHost {
        /// Identifier of the server being resolved.
        server_id: String,
    },
    /// The configured floating IP is not one of the server's public addresses.
    #[error("floating IP {floating_ip} is not attached to server {server_id}")]
    FloatingIpNotValid {
        /// Floating IP supplied by the caller.
        floating_ip: String,
        /// Identifier of the server being resolved.
        server_id: String,
    },
    /// The local machine has no private IPv4 address.
    #[error("no private IPv4 address found on the local host")]
    NoHostIp,
    /// Enumerating local interfaces failed.
    #[error("failed to list local network interfaces: {message}")]
    InterfaceLookup {
        /// Message from the operating system.
        message: String,
    },
}

/// Which part of a server record the guest address is read from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum AddressSelector {
    /// Last address of the named network.
    Network(String),
    /// Last address of the named address slot.
    Slot(String),
    /// The caller supplied floating IP, falling back to the slot named
    /// [`FLOATING_IP_SENTINEL`] when none is supplied.
    FloatingIp,
    /// No explicit choice: discover from public, then private addresses.
    #[default]
    Auto,
}

impl AddressSelector {
    /// Builds a selector from optional network and address slot settings.
    ///
    /// A network wins over an address slot. Blank values count as unset.
    #[must_use]
    pub fn from_settings(network: Option<&str>, address_id: Option<&str>) -> Self {
        let non_blank = |value: &&str| !value.trim().is_empty();
        if let Some(name) = network.filter(non_blank) {
            return Self::Network(name.trim().to_owned());
        }
        match address_id.filter(non_blank).map(str::trim) {
            Some(FLOATING_IP_SENTINEL) => Self::FloatingIp,
            Some(slot) => Self::Slot(slot.to_owned()),
            None => Self::Auto,
        }
    }

    fn explicit_address<'a>(
        &self,
        server: &'a ServerRecord,
        floating_ip: Option<&'a str>,
    ) -> Option<&'a str> {
        match self {
            Self::Network(name) | Self::Slot(name) => server.last_address_on(name),
            Self::FloatingIp => {
                floating_ip.or_else(|| server.last_address_on(FLOATING_IP_SENTINEL))
            }
            Self::Auto => None,
        }
    }
}

/// Resolution settings for both ends of a connection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolutionPolicy {
    /// Guest address selector.
    pub selector: AddressSelector,
    /// Explicit host-side address that bypasses interface detection.
    pub host_ip: Option<String>,
}

impl ResolutionPolicy {
    /// Creates a policy with the given selector and no host override.
    #[must_use]
    pub const fn new(selector: AddressSelector) -> Self {
        Self {
            selector,
            host_ip: None,
        }
    }

    /// Sets the host-side override.
    #[must_use]
    pub fn with_host_ip(mut self, host_ip: Option<String>) -> Self {
        self.host_ip = host_ip;
        self
    }

    /// Resolves the address used to reach `server`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::FloatingIpNotValid`] when auto-discovery finds
    /// public addresses that do not include `floating_ip`, and
    /// [`ResolveError::NoValidHost`] when no address can be determined.
    pub fn machine_ip(
        &self,
        server: &ServerRecord,
        floating_ip: Option<&str>,
    ) -> Result<String, ResolveError> {
        for network in server.network_names() {
            debug!(target: RESOLVE_TARGET, server = %server.id, network, "server network");
        }

        let candidate = match self.selector.explicit_address(server, floating_ip) {
            Some(address) => Some(address.to_owned()),
            None => {
                debug!(
                    target: RESOLVE_TARGET,
                    server = %server.id,
                    selector = ?self.selector,
                    "no explicit address, discovering from public and private addresses"
                );
                discover(server, floating_ip)?
            }
        };

        match candidate {
            Some(address) if !address.is_empty() => Ok(address),
            _ => {
                debug!(target: RESOLVE_TARGET, server = %server.id, "no valid host found");
                Err(ResolveError::NoValidHost {
                    server_id: server.id.clone(),
                })
            }
        }
    }

    /// Resolves the local address the instance should use to reach this host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoHostIp`] when no override is set and the
    /// local machine has no private IPv4 address, or
    /// [`ResolveError::InterfaceLookup`] when interfaces cannot be listed.
    pub fn host_ip<L: InterfaceLister + ?Sized>(&self, lister: &L) -> Result<String, ResolveError> {
        if let Some(host_ip) = self
            .host_ip
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return Ok(host_ip.to_owned());
        }

        let detected = lister
            .private_ipv4_addresses()?
            .into_iter()
            .next()
            .ok_or(ResolveError::NoHostIp)?;
        debug!(target: RESOLVE_TARGET, host_ip = %detected, "detected host address");
        Ok(detected.to_string())
    }
}

fn discover(
    server: &ServerRecord,
    floating_ip: Option<&str>,
) -> Result<Option<String>, ResolveError> {
    if let Some(first_public) = server.public_addresses.first() {
        return match floating_ip {
            Some(floating) if server.has_public_address(floating) => {
                debug!(target: RESOLVE_TARGET, floating_ip = floating, "using floating IP");
                Ok(Some(floating.to_owned()))
            }
            Some(floating) => Err(ResolveError::FloatingIpNotValid {
                floating_ip: floating.to_owned(),
                server_id: server.id.clone(),
            }),
            None => {
                debug!(target: RESOLVE_TARGET, address = %first_public, "using first public address");
                Ok(Some(first_public.clone()))
            }
        };
    }

    let first_private = server.private_addresses.first().cloned();
    if let Some(address) = first_private.as_deref() {
        debug!(target: RESOLVE_TARGET, address, "using first private address");
    }
    Ok(first_private)
}
