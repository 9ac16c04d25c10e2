//! Local interface enumeration for host-side address detection.

use std::net::{Ipv4Addr, SocketAddrV4};

use nix::ifaddrs::getifaddrs;

use super::ResolveError;

/// Lists the private IPv4 addresses of the machine running this code.
pub trait InterfaceLister: Send + Sync {
    /// Returns private IPv4 addresses in interface order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InterfaceLookup`] when the interfaces cannot
    /// be enumerated.
    fn private_ipv4_addresses(&self) -> Result<Vec<Ipv4Addr>, ResolveError>;
}

/// Reads interfaces through `getifaddrs(3)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

impl InterfaceLister for SystemInterfaces {
    fn private_ipv4_addresses(&self) -> Result<Vec<Ipv4Addr>, ResolveError> {
        let interfaces = getifaddrs().map_err(|err| ResolveError::InterfaceLookup {
            message: err.to_string(),
        })?;

        let mut addresses: Vec<Ipv4Addr> = Vec::new();
        for interface in interfaces {
            let Some(storage) = interface.address else {
                continue;
            };
            let Some(ipv4) = storage.as_sockaddr_in() else {
                continue;
            };
            let ip = *SocketAddrV4::from(*ipv4).ip();
            if ip.is_private() && !addresses.contains(&ip) {
                addresses.push(ip);
            }
        }
        Ok(addresses)
    }
}
