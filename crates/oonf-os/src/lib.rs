//! `OsAdapter` (SPEC_FULL.md C): the external-collaborator boundary for
//! interface enumeration/up-down/address events spec.md §1 names as a
//! Non-goal of the protocol engine itself. `LinuxOsAdapter` is the one
//! concrete implementation, built on `lib-ifs`'s `if_nameindex` wrapper
//! the same way the teacher's DHCP/RADV binaries enumerate interfaces.

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub index: u32,
}

#[derive(Debug, Error)]
pub enum OsAdapterError {
    #[cfg(target_os = "linux")]
    #[error("interface enumeration failed: {0}")]
    Enumerate(#[from] lib_ifs::InterfacesError),
}

/// Enumerates local interfaces; up/down transitions and address changes
/// are left to a future netlink-subscription-backed implementation (not
/// built here — `lib-ifs` only wraps the one-shot `if_nameindex` syscall,
/// not `RTMGRP_LINK`/`RTMGRP_IPV4_IFADDR` multicast group subscriptions).
pub trait OsAdapter {
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, OsAdapterError>;
}

#[cfg(target_os = "linux")]
#[derive(Debug, Default)]
pub struct LinuxOsAdapter;

#[cfg(target_os = "linux")]
impl OsAdapter for LinuxOsAdapter {
    fn list_interfaces(&self) -> Result<Vec<InterfaceInfo>, OsAdapterError> {
        let ifs = lib_ifs::if_nameindex()?;
        Ok(ifs.into_iter().map(|i| InterfaceInfo { name: i.name(), index: i.index() }).collect())
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn lists_at_least_loopback() {
        let adapter = LinuxOsAdapter;
        let ifaces = adapter.list_interfaces().expect("if_nameindex should succeed in CI sandboxes");
        assert!(ifaces.iter().any(|i| i.name == "lo"));
    }
}
