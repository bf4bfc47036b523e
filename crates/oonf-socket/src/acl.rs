use std::net::IpAddr;

use ipnetwork::IpNetwork;

/// A permitted/denied-source prefix list (spec.md §4.2's `apply_config`
/// ACL and bind-ACL). Deny entries take precedence; if any allow entry is
/// present an address must match one to pass, otherwise everything not
/// denied is permitted.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    allow: Vec<IpNetwork>,
    deny: Vec<IpNetwork>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, net: IpNetwork) -> Self {
        self.allow.push(net);
        self
    }

    pub fn deny(mut self, net: IpNetwork) -> Self {
        self.deny.push(net);
        self
    }

    pub fn permits(&self, addr: IpAddr) -> bool {
        if self.deny.iter().any(|n| n.contains(addr)) {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|n| n.contains(addr))
    }

    /// Picks the first address from `candidates` this ACL permits, for
    /// bind-address selection.
    pub fn select<'a>(&self, candidates: impl IntoIterator<Item = &'a IpAddr>) -> Option<IpAddr> {
        candidates.into_iter().find(|a| self.permits(**a)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn deny_overrides_allow() {
        let acl = Acl::new()
            .allow("10.0.0.0/8".parse().unwrap())
            .deny("10.0.0.1/32".parse().unwrap());
        assert!(acl.permits(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))));
        assert!(!acl.permits(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    }

    #[test]
    fn empty_allow_list_permits_everything_not_denied() {
        let acl = Acl::new().deny("192.168.0.0/16".parse().unwrap());
        assert!(acl.permits(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
        assert!(!acl.permits(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
    }
}
