//! `RouteInstaller` (spec.md §4.10): diffs the last-installed route table
//! against a fresh Dijkstra result and submits the four ordered operation
//! groups to a pluggable OS route backend. Grounded on
//! `examples/original_source/src/olsrv2/olsrv2/olsrv2_routing.c`'s
//! route-diff/commit cycle.

use std::collections::HashMap;

use oonf_core::netaddr::{NetAddr, RouteKey};

use crate::dijkstra::RoutingEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOpError {
    /// ESRCH on removal / EEXIST on add: the backend already agrees with
    /// the desired state, treated as success.
    AlreadyConverged,
    Other,
}

/// The OS-facing side of route installation; `NetlinkRouteBackend` is the
/// production implementation, `NullRouteBackend` is for tests and
/// dry-run/freeze-routes operation.
pub trait RouteBackend {
    fn add_or_update(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError>;
    fn remove(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError>;
}

#[derive(Debug, Clone)]
pub struct InstalledRoute {
    pub key: RouteKey,
    pub next_originator: NetAddr,
    pub path_cost: u32,
    pub path_hops: u32,
    pub interface: String,
}

#[derive(Default)]
pub struct NullRouteBackend {
    pub installed: Vec<RouteKey>,
}

impl RouteBackend for NullRouteBackend {
    fn add_or_update(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        self.installed.push(entry.key);
        Ok(())
    }

    fn remove(&mut self, entry: &InstalledRoute) -> Result<(), RouteOpError> {
        self.installed.retain(|k| *k != entry.key);
        Ok(())
    }
}

/// Per-domain desired/installed route state plus the freeze flag.
pub struct RouteInstaller {
    installed: HashMap<RouteKey, InstalledRoute>,
    frozen: bool,
}

impl RouteInstaller {
    pub fn new() -> Self {
        Self {
            installed: HashMap::new(),
            frozen: false,
        }
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn installed_routes(&self) -> impl Iterator<Item = &InstalledRoute> {
        self.installed.values()
    }

    /// Diffs `desired` against the currently-installed table and submits
    /// the four ordered groups of spec.md §4.10 to `backend`. A no-op
    /// (besides recording intent) while frozen.
    pub fn apply(&mut self, desired: &[RoutingEntry], interface_for: impl Fn(&NetAddr) -> String, backend: &mut impl RouteBackend) {
        let desired_map: HashMap<RouteKey, InstalledRoute> = desired
            .iter()
            .map(|e| {
                (
                    e.route,
                    InstalledRoute {
                        key: e.route,
                        next_originator: e.next_originator,
                        path_cost: e.path_cost,
                        path_hops: e.path_hops,
                        interface: interface_for(&e.next_originator),
                    },
                )
            })
            .collect();

        if self.frozen {
            self.installed = desired_map;
            return;
        }

        let is_multi_hop = |r: &InstalledRoute| r.path_hops > 1;

        let removed: Vec<InstalledRoute> =
            self.installed.iter().filter(|(k, _)| !desired_map.contains_key(k)).map(|(_, v)| v.clone()).collect();
        let (removed_multi, removed_single): (Vec<_>, Vec<_>) = removed.into_iter().partition(is_multi_hop);

        let added_or_changed: Vec<InstalledRoute> = desired_map
            .iter()
            .filter(|(k, v)| self.installed.get(k).map(|cur| cur.next_originator != v.next_originator || cur.path_cost != v.path_cost).unwrap_or(true))
            .map(|(_, v)| v.clone())
            .collect();
        let (added_multi, added_single): (Vec<_>, Vec<_>) = added_or_changed.into_iter().partition(is_multi_hop);

        let mut failed_adds: Vec<RouteKey> = Vec::new();
        let mut failed_removes: Vec<RouteKey> = Vec::new();

        for entry in &removed_multi {
            if !self.submit_remove(entry, backend) {
                failed_removes.push(entry.key);
            }
        }
        for entry in &added_single {
            if !self.submit_add(entry, backend) {
                failed_adds.push(entry.key);
            }
        }
        for entry in &added_multi {
            if !self.submit_add(entry, backend) {
                failed_adds.push(entry.key);
            }
        }
        for entry in &removed_single {
            if !self.submit_remove(entry, backend) {
                failed_removes.push(entry.key);
            }
        }

        let old_installed = std::mem::take(&mut self.installed);
        let mut next = desired_map;
        for key in &failed_adds {
            next.remove(key);
        }
        for key in &failed_removes {
            if let Some(old) = old_installed.get(key) {
                next.insert(*key, old.clone());
            }
        }
        self.installed = next;
    }

    /// Returns whether the backend's state now matches what was submitted
    /// (`Ok` or `AlreadyConverged`); `false` means the optimistic
    /// `self.installed` entry for this route must not be kept.
    fn submit_add(&self, entry: &InstalledRoute, backend: &mut impl RouteBackend) -> bool {
        match backend.add_or_update(entry) {
            Ok(()) | Err(RouteOpError::AlreadyConverged) => true,
            Err(RouteOpError::Other) => {
                tracing::warn!(route = %entry.key, "route add failed, reverting optimistic state");
                false
            }
        }
    }

    fn submit_remove(&self, entry: &InstalledRoute, backend: &mut impl RouteBackend) -> bool {
        match backend.remove(entry) {
            Ok(()) | Err(RouteOpError::AlreadyConverged) => true,
            Err(RouteOpError::Other) => {
                tracing::warn!(route = %entry.key, "route removal failed, reverting optimistic state");
                false
            }
        }
    }
}

impl Default for RouteInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn entry(last: u8, hops: u32, cost: u32) -> RoutingEntry {
        let dst = NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, last));
        RoutingEntry {
            route: RouteKey::new(dst),
            path_cost: cost,
            path_hops: hops,
            next_originator: dst,
            last_originator: dst,
            distance: 0,
        }
    }

    /// A backend that always reports [`RouteOpError::Other`], for
    /// exercising the optimistic-state revert on submit failure.
    #[derive(Default)]
    struct FailingBackend;

    impl RouteBackend for FailingBackend {
        fn add_or_update(&mut self, _entry: &InstalledRoute) -> Result<(), RouteOpError> {
            Err(RouteOpError::Other)
        }

        fn remove(&mut self, _entry: &InstalledRoute) -> Result<(), RouteOpError> {
            Err(RouteOpError::Other)
        }
    }

    #[test]
    fn new_single_hop_routes_are_installed() {
        let mut installer = RouteInstaller::new();
        let mut backend = NullRouteBackend::default();
        installer.apply(&[entry(1, 1, 10)], |_| "wlan0".to_string(), &mut backend);
        assert_eq!(backend.installed.len(), 1);
    }

    #[test]
    fn routes_dropped_from_desired_set_are_removed() {
        let mut installer = RouteInstaller::new();
        let mut backend = NullRouteBackend::default();
        installer.apply(&[entry(1, 1, 10)], |_| "wlan0".to_string(), &mut backend);
        installer.apply(&[], |_| "wlan0".to_string(), &mut backend);
        assert!(backend.installed.is_empty());
    }

    #[test]
    fn freezing_suspends_backend_mutations_but_keeps_desired_state() {
        let mut installer = RouteInstaller::new();
        let mut backend = NullRouteBackend::default();
        installer.set_frozen(true);
        installer.apply(&[entry(1, 1, 10)], |_| "wlan0".to_string(), &mut backend);
        assert!(backend.installed.is_empty());
        assert_eq!(installer.installed_routes().count(), 1);
    }

    #[test]
    fn failed_add_is_not_recorded_as_installed() {
        let mut installer = RouteInstaller::new();
        let mut backend = FailingBackend;
        installer.apply(&[entry(1, 1, 10)], |_| "wlan0".to_string(), &mut backend);
        assert_eq!(installer.installed_routes().count(), 0);
    }

    #[test]
    fn failed_removal_is_kept_installed_so_the_next_diff_retries() {
        let mut installer = RouteInstaller::new();
        let mut ok_backend = NullRouteBackend::default();
        installer.apply(&[entry(1, 1, 10)], |_| "wlan0".to_string(), &mut ok_backend);
        assert_eq!(installer.installed_routes().count(), 1);

        let mut failing = FailingBackend;
        installer.apply(&[], |_| "wlan0".to_string(), &mut failing);
        let remaining: Vec<_> = installer.installed_routes().collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path_cost, 10);
    }
}
