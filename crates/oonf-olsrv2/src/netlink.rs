//! `NetlinkRouteBackend` (SPEC_FULL.md A.4/C): the production
//! [`RouteBackend`] that actually programs the kernel FIB, grounded on
//! `rtnetlink`'s `Handle` the way `holo-routing` drives its own netlink
//! provider. `RouteInstaller::apply` is synchronous, so every call here
//! blocks the calling thread on the daemon's tokio runtime via
//! `block_in_place`; this keeps the single-task event loop model of
//! spec.md §1 intact at the cost of a short stall per route mutation.

use std::net::IpAddr;

use futures::stream::TryStreamExt;
use rtnetlink::{new_connection, Handle};
use tokio::task::block_in_place;

use oonf_core::netaddr::NetAddr;

use crate::route::{InstalledRoute, RouteBackend, RouteOpError};

pub struct NetlinkRouteBackend {
    handle: Handle,
    table: u32,
}

impl NetlinkRouteBackend {
    /// Opens the netlink socket and spawns its driving connection task on
    /// the current tokio runtime. Must be called from within a `#[tokio::main]`
    /// (or equivalent) context.
    pub fn new(table: u32) -> Result<Self, rtnetlink::Error> {
        let (connection, handle, _messages) = new_connection()?;
        tokio::spawn(connection);
        Ok(Self { handle, table })
    }

    fn gateway(entry: &InstalledRoute) -> Option<IpAddr> {
        entry.next_originator.as_ip()
    }

    fn destination(entry: &InstalledRoute) -> Option<(IpAddr, u8)> {
        match entry.key.dst {
            NetAddr::V4(n) => Some((IpAddr::V4(n.ip()), n.prefix())),
            NetAddr::V6(n) => Some((IpAddr::V6(n.ip()), n.prefix())),
            NetAddr::Mac48(_) | NetAddr::Eui64(_) => None,
        }
    }

    async fn add_or_update_async(&self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        let Some((dst, prefix)) = Self::destination(entry) else {
            return Err(RouteOpError::Other);
        };
        let Some(gw) = Self::gateway(entry) else {
            return Err(RouteOpError::Other);
        };

        let request = match (dst, gw) {
            (IpAddr::V4(dst), IpAddr::V4(gw)) => self
                .handle
                .route()
                .add()
                .v4()
                .destination_prefix(dst, prefix)
                .gateway(gw)
                .table_id(self.table),
            (IpAddr::V6(dst), IpAddr::V6(gw)) => {
                return self
                    .handle
                    .route()
                    .add()
                    .v6()
                    .destination_prefix(dst, prefix)
                    .gateway(gw)
                    .table_id(self.table)
                    .execute()
                    .await
                    .map_err(classify_add_error);
            }
            _ => return Err(RouteOpError::Other),
        };

        request.execute().await.map_err(classify_add_error)
    }

    async fn remove_async(&self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        let Some((dst, prefix)) = Self::destination(entry) else {
            return Err(RouteOpError::Other);
        };

        let mut routes = self.handle.route().get(match dst {
            IpAddr::V4(_) => rtnetlink::IpVersion::V4,
            IpAddr::V6(_) => rtnetlink::IpVersion::V6,
        });

        while let Ok(Some(route)) = routes.execute().try_next().await {
            if route_matches(&route, dst, prefix, self.table) {
                return self.handle.route().del(route).execute().await.map_err(classify_del_error);
            }
        }

        Err(RouteOpError::AlreadyConverged)
    }
}

fn route_matches(route: &rtnetlink::packet_route::route::RouteMessage, dst: IpAddr, prefix: u8, table: u32) -> bool {
    use rtnetlink::packet_route::route::RouteAttribute;

    if route.header.destination_prefix_length != prefix {
        return false;
    }
    if route.header.table as u32 != table {
        return false;
    }
    route.attributes.iter().any(|attr| matches!(attr, RouteAttribute::Destination(addr) if addr_eq(*addr, dst)))
}

fn addr_eq(a: std::net::IpAddr, b: std::net::IpAddr) -> bool {
    a == b
}

fn classify_add_error(e: rtnetlink::Error) -> RouteOpError {
    if matches!(&e, rtnetlink::Error::NetlinkError(m) if m.raw_code() == -17) {
        RouteOpError::AlreadyConverged
    } else {
        tracing::warn!(error = %e, "netlink route add failed");
        RouteOpError::Other
    }
}

fn classify_del_error(e: rtnetlink::Error) -> RouteOpError {
    if matches!(&e, rtnetlink::Error::NetlinkError(m) if m.raw_code() == -3) {
        RouteOpError::AlreadyConverged
    } else {
        tracing::warn!(error = %e, "netlink route removal failed");
        RouteOpError::Other
    }
}

impl RouteBackend for NetlinkRouteBackend {
    fn add_or_update(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        block_in_place(|| tokio::runtime::Handle::current().block_on(self.add_or_update_async(entry)))
    }

    fn remove(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        block_in_place(|| tokio::runtime::Handle::current().block_on(self.remove_async(entry)))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use ipnetwork::Ipv4Network;

    use super::*;
    use crate::route::InstalledRoute;
    use oonf_core::netaddr::{Mac48, RouteKey};

    fn v4_entry(dst: Ipv4Addr, prefix: u8, gw: Ipv4Addr) -> InstalledRoute {
        InstalledRoute {
            key: RouteKey::new(NetAddr::V4(Ipv4Network::new(dst, prefix).unwrap())),
            next_originator: NetAddr::host_v4(gw),
            path_cost: 512,
            path_hops: 2,
        }
    }

    #[test]
    fn destination_extracts_v4_prefix() {
        let entry = v4_entry(Ipv4Addr::new(10, 1, 0, 0), 16, Ipv4Addr::new(10, 0, 0, 2));
        let (addr, prefix) = NetlinkRouteBackend::destination(&entry).expect("v4 destination");
        assert_eq!(addr, IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0)));
        assert_eq!(prefix, 16);
    }

    #[test]
    fn gateway_extracts_next_originator_as_ip() {
        let entry = v4_entry(Ipv4Addr::new(10, 1, 0, 0), 16, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(NetlinkRouteBackend::gateway(&entry), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))));
    }

    #[test]
    fn destination_rejects_mac_addresses() {
        let entry = InstalledRoute {
            key: RouteKey::new(NetAddr::Mac48(Mac48([0, 1, 2, 3, 4, 5]))),
            next_originator: NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 2)),
            path_cost: 0,
            path_hops: 1,
        };
        assert!(NetlinkRouteBackend::destination(&entry).is_none());
    }
}
