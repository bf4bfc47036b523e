//! Tagged addresses used throughout the protocol engine: originators, link
//! addresses, MAC-derived link identities and destination prefixes all share
//! this one type, mirroring the original's `struct netaddr`.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

/// Address family tag, kept explicit (rather than inferred from the byte
/// length) because MAC48 and EUI64 both fit in fewer bytes than an IPv6
/// address and the wire format needs an unambiguous discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    Mac48,
    Eui64,
}

/// A variable-length link identifier: the opaque suffix NHDP appends to a
/// MAC address to disambiguate radio "link handles" sharing one MAC.
pub type LinkId = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mac48(pub [u8; 6]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Eui64(pub [u8; 8]);

impl fmt::Display for Mac48 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// NetAddr = {family, bytes, prefix-length}. IPv4/IPv6 carry a real prefix
/// length; MAC48/EUI64 are always host routes (prefix length = bit width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetAddr {
    V4(Ipv4Network),
    V6(Ipv6Network),
    Mac48(Mac48),
    Eui64(Eui64),
}

impl NetAddr {
    pub fn family(&self) -> AddressFamily {
        match self {
            NetAddr::V4(_) => AddressFamily::Ipv4,
            NetAddr::V6(_) => AddressFamily::Ipv6,
            NetAddr::Mac48(_) => AddressFamily::Mac48,
            NetAddr::Eui64(_) => AddressFamily::Eui64,
        }
    }

    pub fn host_v4(addr: Ipv4Addr) -> Self {
        NetAddr::V4(Ipv4Network::new(addr, 32).expect("prefix 32 is always valid"))
    }

    pub fn host_v6(addr: Ipv6Addr) -> Self {
        NetAddr::V6(Ipv6Network::new(addr, 128).expect("prefix 128 is always valid"))
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            NetAddr::V4(n) => n.prefix(),
            NetAddr::V6(n) => n.prefix(),
            NetAddr::Mac48(_) => 48,
            NetAddr::Eui64(_) => 64,
        }
    }

    pub fn is_host(&self) -> bool {
        match self {
            NetAddr::V4(n) => n.prefix() == 32,
            NetAddr::V6(n) => n.prefix() == 128,
            NetAddr::Mac48(_) | NetAddr::Eui64(_) => true,
        }
    }

    /// True for addresses that can never be a valid routing destination:
    /// unspecified, loopback, or link-local.
    pub fn is_routable(&self) -> bool {
        match self {
            NetAddr::V4(n) => {
                let ip = n.ip();
                !(ip.is_unspecified() || ip.is_loopback() || ip.is_link_local())
            }
            NetAddr::V6(n) => {
                let ip = n.ip();
                !(ip.is_unspecified() || ip.is_loopback() || is_v6_link_local(&ip))
            }
            NetAddr::Mac48(_) | NetAddr::Eui64(_) => false,
        }
    }

    pub fn is_link_local(&self) -> bool {
        match self {
            NetAddr::V4(n) => n.ip().is_link_local(),
            NetAddr::V6(n) => is_v6_link_local(&n.ip()),
            _ => false,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            NetAddr::V4(n) => Some(IpAddr::V4(n.ip())),
            NetAddr::V6(n) => Some(IpAddr::V6(n.ip())),
            _ => None,
        }
    }

    pub fn network(&self) -> Option<IpNetwork> {
        match self {
            NetAddr::V4(n) => Some(IpNetwork::V4(*n)),
            NetAddr::V6(n) => Some(IpNetwork::V6(*n)),
            _ => None,
        }
    }
}

fn is_v6_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetAddr::V4(n) if n.prefix() == 32 => write!(f, "{}", n.ip()),
            NetAddr::V4(n) => write!(f, "{}", n),
            NetAddr::V6(n) if n.prefix() == 128 => write!(f, "{}", n.ip()),
            NetAddr::V6(n) => write!(f, "{}", n),
            NetAddr::Mac48(m) => write!(f, "{}", m),
            NetAddr::Eui64(e) => write!(f, "{}", e),
        }
    }
}

/// (dst prefix, src prefix); an empty src prefix (length 0, unspecified)
/// means "not source-specific".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub dst: NetAddr,
    pub src: Option<NetAddr>,
}

impl RouteKey {
    pub fn new(dst: NetAddr) -> Self {
        Self { dst, src: None }
    }

    pub fn with_source(dst: NetAddr, src: NetAddr) -> Self {
        Self {
            dst,
            src: if src.prefix_len() == 0 { None } else { Some(src) },
        }
    }

    pub fn is_source_specific(&self) -> bool {
        self.src.is_some()
    }

    pub fn family(&self) -> AddressFamily {
        self.dst.family()
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.src {
            Some(src) => write!(f, "{} from {}", self.dst, src),
            None => write!(f, "{}", self.dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_addresses_are_prefix_32_or_128() {
        let v4 = NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 1));
        assert!(v4.is_host());
        assert_eq!(v4.prefix_len(), 32);

        let v6 = NetAddr::host_v6(Ipv6Addr::LOCALHOST);
        assert!(!v6.is_routable());
    }

    #[test]
    fn route_key_with_zero_length_source_is_non_source_specific() {
        let dst = NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 1));
        let src = NetAddr::V4(Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0).unwrap());
        let key = RouteKey::with_source(dst, src);
        assert!(!key.is_source_specific());
    }

    #[test]
    fn link_local_v6_is_not_routable() {
        let ll = NetAddr::host_v6("fe80::1".parse().unwrap());
        assert!(ll.is_link_local());
        assert!(!ll.is_routable());
    }
}
