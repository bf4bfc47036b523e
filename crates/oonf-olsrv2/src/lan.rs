//! Locally-attached networks (spec.md §3's `LocallyAttachedNetwork`):
//! prefixes this node itself originates into the domain, Dijkstra targets
//! on the same footing as a remote `TcAttachment` (spec.md §4.9's
//! `Target ≡ TcNode | TcEndpoint(attachment) | LAN`). Grounded on
//! `tc.rs`'s flat (non-per-domain-map) field shape for `TcAttachment`,
//! since this daemon ships one built-in domain.

use oonf_core::netaddr::RouteKey;

#[derive(Debug, Clone)]
pub struct LocalLan {
    pub route: RouteKey,
    pub active: bool,
    pub outgoing_metric: u32,
    pub distance: u8,
}

impl LocalLan {
    pub fn new(route: RouteKey, outgoing_metric: u32, distance: u8) -> Self {
        Self {
            route,
            active: true,
            outgoing_metric,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::netaddr::NetAddr;
    use std::net::Ipv4Addr;

    #[test]
    fn new_lan_starts_active() {
        let route = RouteKey::new(NetAddr::host_v4(Ipv4Addr::new(10, 1, 0, 0)));
        let lan = LocalLan::new(route, 5, 2);
        assert!(lan.active);
        assert_eq!(lan.outgoing_metric, 5);
        assert_eq!(lan.distance, 2);
    }
}
