//! Server records returned by a compute gateway.
//!
//! A [`ServerRecord`] is a read-only snapshot of a remote instance: its
//! identifier, name, per-network address lists, and the public and private
//! address buckets the provider derived from them.

use std::collections::BTreeMap;

/// IP family of a single network address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressFamily {
    /// IPv4 address.
    V4,
    /// IPv6 address.
    V6,
}

impl AddressFamily {
    /// Maps the numeric `version` field used by compute APIs onto a family.
    ///
    /// Unknown versions are treated as IPv4, which is what providers report
    /// when the field is omitted.
    #[must_use]
    pub const fn from_version(version: u8) -> Self {
        match version {
            6 => Self::V6,
            _ => Self::V4,
        }
    }
}

/// A single address attached to a named network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkAddress {
    /// Textual address as reported by the provider.
    pub address: String,
    /// Address family.
    pub family: AddressFamily,
}

impl NetworkAddress {
    /// Creates an IPv4 address entry.
    #[must_use]
    pub fn v4(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            family: AddressFamily::V4,
        }
    }

    /// Creates an IPv6 address entry.
    #[must_use]
    pub fn v6(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            family: AddressFamily::V6,
        }
    }
}

/// Snapshot of a remote server.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerRecord {
    /// Provider identifier, stable while the instance exists.
    pub id: String,
    /// Human readable server name.
    pub name: String,
    /// Addresses keyed by network name, each list in provider order.
    pub addresses: BTreeMap<String, Vec<NetworkAddress>>,
    /// Publicly routable addresses, first entry preferred.
    pub public_addresses: Vec<String>,
    /// Private addresses, first entry preferred.
    pub private_addresses: Vec<String>,
}

impl ServerRecord {
    /// Creates a record with no addresses.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds (or replaces) the address list of a network.
    #[must_use]
    pub fn with_network(
        mut self,
        network: impl Into<String>,
        addresses: impl IntoIterator<Item = NetworkAddress>,
    ) -> Self {
        self.addresses
            .insert(network.into(), addresses.into_iter().collect());
        self
    }

    /// Sets the public address bucket.
    #[must_use]
    pub fn with_public_addresses<S: Into<String>>(
        mut self,
        addresses: impl IntoIterator<Item = S>,
    ) -> Self {
        self.public_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the private address bucket.
    #[must_use]
    pub fn with_private_addresses<S: Into<String>>(
        mut self,
        addresses: impl IntoIterator<Item = S>,
    ) -> Self {
        self.private_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the last address listed for `network`, or `None` when the
    /// network is unknown or carries no addresses.
    #[must_use]
    pub fn last_address_on(&self, network: &str) -> Option<&str> {
        self.addresses
            .get(network)
            .and_then(|entries| entries.last())
            .map(|entry| entry.address.as_str())
    }

    /// Returns whether `address` is one of the server's public addresses.
    #[must_use]
    pub fn has_public_address(&self, address: &str) -> bool {
        self.public_addresses.iter().any(|public| public == address)
    }

    /// Names of every network the server is attached to.
    pub fn network_names(&self) -> impl Iterator<Item = &str> {
        self.addresses.keys().map(String::as_str)
    }
}
