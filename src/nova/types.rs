//! Wire types for the compute API and their mapping onto [`ServerRecord`].

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::server::{AddressFamily, NetworkAddress, ServerRecord};

const FLOATING_TYPE: &str = "floating";

#[derive(Debug, Deserialize)]
pub(super) struct ServerEnvelope {
    pub(super) server: NovaServer,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServersEnvelope {
    #[serde(default)]
    pub(super) servers: Vec<NovaServer>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NovaServer {
    pub(super) id: String,
    #[serde(default)]
    pub(super) name: String,
    #[serde(default)]
    pub(super) addresses: BTreeMap<String, Vec<NovaAddress>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NovaAddress {
    pub(super) addr: String,
    #[serde(default = "default_version")]
    pub(super) version: u8,
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub(super) ip_type: Option<String>,
}

const fn default_version() -> u8 {
    4
}

impl NovaServer {
    fn all_addresses(&self) -> impl Iterator<Item = &NovaAddress> {
        self.addresses.values().flatten()
    }

    fn floating_addresses(&self) -> Vec<String> {
        self.all_addresses()
            .filter(|entry| entry.ip_type.as_deref() == Some(FLOATING_TYPE))
            .map(|entry| entry.addr.clone())
            .collect()
    }

    /// Floating addresses when any exist, otherwise the first address of
    /// every network whose name mentions `public`.
    fn public_addresses(&self, floating: &[String]) -> Vec<String> {
        if !floating.is_empty() {
            return floating.to_vec();
        }
        self.addresses
            .iter()
            .filter(|(network, _)| network.to_ascii_lowercase().contains("public"))
            .filter_map(|(_, entries)| entries.first())
            .map(|entry| entry.addr.clone())
            .collect()
    }

    /// RFC 1918 IPv4 addresses that are neither public nor floating.
    fn private_addresses(&self, public: &[String], floating: &[String]) -> Vec<String> {
        self.all_addresses()
            .map(|entry| entry.addr.as_str())
            .filter(|addr| !public.iter().any(|known| known == addr))
            .filter(|addr| !floating.iter().any(|known| known == addr))
            .filter(|addr| addr.parse::<Ipv4Addr>().is_ok_and(|ip| ip.is_private()))
            .map(str::to_owned)
            .collect()
    }
}

impl From<NovaServer> for ServerRecord {
    fn from(server: NovaServer) -> Self {
        let floating = server.floating_addresses();
        let public_addresses = server.public_addresses(&floating);
        let private_addresses = server.private_addresses(&public_addresses, &floating);
        let addresses = server
            .addresses
            .into_iter()
            .map(|(network, entries)| {
                let converted = entries
                    .into_iter()
                    .map(|entry| NetworkAddress {
                        address: entry.addr,
                        family: AddressFamily::from_version(entry.version),
                    })
                    .collect();
                (network, converted)
            })
            .collect();

        Self {
            id: server.id,
            name: server.name,
            addresses,
            public_addresses,
            private_addresses,
        }
    }
}
