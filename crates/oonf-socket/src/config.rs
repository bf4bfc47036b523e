use std::net::{Ipv4Addr, Ipv6Addr};

use crate::acl::Acl;

/// Per-interface socket configuration (spec.md §4.2's `apply_config`):
/// which sources are accepted, which local address to bind to, the
/// unicast/multicast ports and group, TTL/DSCP, and whether the socket
/// operates in raw-IP mode.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub acl: Acl,
    pub bind_acl: Acl,
    pub unicast_port: u16,
    pub multicast_port: u16,
    pub multicast_group_v4: Ipv4Addr,
    pub multicast_group_v6: Ipv6Addr,
    pub ttl: u32,
    pub dscp: u8,
    pub raw_ip: bool,
    pub loop_multicast: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            acl: Acl::new(),
            bind_acl: Acl::new(),
            unicast_port: 698,
            multicast_port: 698,
            multicast_group_v4: Ipv4Addr::new(224, 0, 0, 109),
            multicast_group_v6: "ff02::6d".parse().unwrap(),
            ttl: 1,
            dscp: 0,
            raw_ip: false,
            loop_multicast: false,
        }
    }
}
