use std::collections::BTreeMap;

use oonf_core::changebus::{Bus, ChangeKind};
use oonf_core::netaddr::{Mac48, NetAddr};

use crate::data::DataValue;
use crate::error::Layer2Error;
use crate::net::Layer2Net;
use crate::neigh::Layer2Neigh;
use crate::origin::OriginHandle;

/// Identifies the entity an event fired for: either a whole interface or a
/// single-hop neighbor on one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer2EntityKey {
    Net { ifname: String },
    Neigh { ifname: String, mac: Mac48 },
}

#[derive(Debug, Clone)]
pub struct Layer2Event {
    pub key: Layer2EntityKey,
}

/// The Layer2 information base of spec.md §4.4: interfaces, their
/// single-hop neighbors, and the origin-prioritized data slots attached to
/// each. Writers never overwrite data from a higher-priority origin; stale
/// entries are reaped on [`Layer2Db::commit`].
#[derive(Default)]
pub struct Layer2Db {
    origins: Vec<OriginHandle>,
    nets: BTreeMap<String, Layer2Net>,
    bus: Bus<Layer2Event>,
}

impl Layer2Db {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(ChangeKind, &Layer2Event) + 'static) {
        self.bus.subscribe(listener);
    }

    // -- origins ---------------------------------------------------------

    pub fn origin_add(&mut self, name: impl Into<String>, priority: i32, proactive: bool) -> OriginHandle {
        let handle = OriginHandle::new(name, priority, proactive);
        self.origins.push(handle.clone());
        handle
    }

    /// Removes the origin's registration and resets every data slot it was
    /// the last writer of, so a departed origin's stale readings don't
    /// linger forever (spec.md §4.4).
    pub fn origin_remove(&mut self, origin: &OriginHandle) {
        self.origins.retain(|o| !o.same_origin(origin));
        for net in self.nets.values_mut() {
            reset_slot_if_owned(&mut net.data.tx_max_bitrate, origin);
            reset_slot_if_owned(&mut net.data.rx_max_bitrate, origin);
            reset_slot_if_owned(&mut net.data.mtu, origin);
            reset_slot_if_owned(&mut net.data.is_up, origin);
            for neigh in net.neighbors.values_mut() {
                reset_slot_if_owned(&mut neigh.data.tx_bitrate, origin);
                reset_slot_if_owned(&mut neigh.data.rx_bitrate, origin);
                reset_slot_if_owned(&mut neigh.data.tx_frames, origin);
                reset_slot_if_owned(&mut neigh.data.tx_retries, origin);
                reset_slot_if_owned(&mut neigh.data.tx_failed, origin);
                reset_slot_if_owned(&mut neigh.data.rx_signal_dbm, origin);
            }
        }
    }

    // -- nets --------------------------------------------------------

    pub fn net_add(&mut self, ifname: &str) -> &mut Layer2Net {
        self.nets
            .entry(ifname.to_string())
            .or_insert_with(|| Layer2Net::new(ifname))
    }

    pub fn net_get(&self, ifname: &str) -> Option<&Layer2Net> {
        self.nets.get(ifname)
    }

    pub fn net_get_mut(&mut self, ifname: &str) -> Option<&mut Layer2Net> {
        self.nets.get_mut(ifname)
    }

    pub fn net_remove(&mut self, ifname: &str) -> Option<Layer2Net> {
        let removed = self.nets.remove(ifname);
        if removed.is_some() {
            self.bus.publish(
                ChangeKind::Removed,
                &Layer2Event {
                    key: Layer2EntityKey::Net {
                        ifname: ifname.to_string(),
                    },
                },
            );
        }
        removed
    }

    /// Renames an interface in place (e.g. after a link is recreated with a
    /// new kernel index but the same name stays the identity NHDP cares
    /// about). Neighbors and data carry over unchanged.
    pub fn relabel(&mut self, old_ifname: &str, new_ifname: &str) -> Result<(), Layer2Error> {
        let mut net = self
            .nets
            .remove(old_ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(old_ifname.to_string()))?;
        net.ifname = new_ifname.to_string();
        net.touched = true;
        self.nets.insert(new_ifname.to_string(), net);
        Ok(())
    }

    // -- neighbors ---------------------------------------------------

    pub fn neigh_add(&mut self, ifname: &str, mac: Mac48) -> Result<&mut Layer2Neigh, Layer2Error> {
        let net = self
            .nets
            .get_mut(ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(ifname.to_string()))?;
        net.touched = true;
        Ok(net
            .neighbors
            .entry(mac)
            .or_insert_with(|| Layer2Neigh::new(mac)))
    }

    pub fn neigh_get(&self, ifname: &str, mac: Mac48) -> Option<&Layer2Neigh> {
        self.nets.get(ifname).and_then(|n| n.neighbor(mac))
    }

    pub fn neigh_get_mut(&mut self, ifname: &str, mac: Mac48) -> Option<&mut Layer2Neigh> {
        self.nets.get_mut(ifname)?.neighbors.get_mut(&mac)
    }

    pub fn neigh_remove(&mut self, ifname: &str, mac: Mac48) -> Result<(), Layer2Error> {
        let net = self
            .nets
            .get_mut(ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(ifname.to_string()))?;
        if net.neighbors.remove(&mac).is_some() {
            self.bus.publish(
                ChangeKind::Removed,
                &Layer2Event {
                    key: Layer2EntityKey::Neigh {
                        ifname: ifname.to_string(),
                        mac,
                    },
                },
            );
            Ok(())
        } else {
            Err(Layer2Error::NoSuchNeigh {
                ifname: ifname.to_string(),
                mac: mac.to_string(),
            })
        }
    }

    // -- data ----------------------------------------------------------

    /// Writes `value` into a net-level slot selected by `pick`, honoring
    /// the origin priority gate (spec.md §4.4, testable property 5).
    /// Returns whether the write was admitted and whether it changed the
    /// stored value.
    pub fn data_set_net(
        &mut self,
        ifname: &str,
        origin: &OriginHandle,
        pick: impl FnOnce(&mut crate::net::Layer2NetData) -> &mut crate::data::DataSlot,
        value: DataValue,
    ) -> Result<bool, Layer2Error> {
        let net = self
            .nets
            .get_mut(ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(ifname.to_string()))?;
        net.touched = true;
        Ok(pick(&mut net.data).set(origin, value))
    }

    pub fn data_set_neigh(
        &mut self,
        ifname: &str,
        mac: Mac48,
        origin: &OriginHandle,
        pick: impl FnOnce(&mut crate::neigh::Layer2NeighData) -> &mut crate::data::DataSlot,
        value: DataValue,
    ) -> Result<bool, Layer2Error> {
        let net = self
            .nets
            .get_mut(ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(ifname.to_string()))?;
        let neigh = net
            .neighbors
            .get_mut(&mac)
            .ok_or_else(|| Layer2Error::NoSuchNeigh {
                ifname: ifname.to_string(),
                mac: mac.to_string(),
            })?;
        net.touched = true;
        neigh.touched = true;
        Ok(pick(&mut neigh.data).set(origin, value))
    }

    pub fn data_reset_net(
        &mut self,
        ifname: &str,
        pick: impl FnOnce(&mut crate::net::Layer2NetData) -> &mut crate::data::DataSlot,
    ) -> Result<(), Layer2Error> {
        let net = self
            .nets
            .get_mut(ifname)
            .ok_or_else(|| Layer2Error::NoSuchNet(ifname.to_string()))?;
        pick(&mut net.data).reset();
        Ok(())
    }

    // -- transactional refresh -------------------------------------------

    /// Reaps every net/neighbor not touched since the last commit and
    /// publishes Added/Changed for the rest, then clears the touched marks
    /// for the next round. Call once per refresh cycle (e.g. after a batch
    /// of driver readings or a DAT recompute).
    pub fn commit(&mut self) {
        let mut removed_nets = Vec::new();
        for (ifname, net) in self.nets.iter_mut() {
            let mut removed_neighs = Vec::new();
            for (mac, neigh) in net.neighbors.iter_mut() {
                if neigh.touched {
                    let kind = if neigh.is_new {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Changed
                    };
                    neigh.touched = false;
                    neigh.is_new = false;
                    self.bus.publish(
                        kind,
                        &Layer2Event {
                            key: Layer2EntityKey::Neigh {
                                ifname: ifname.clone(),
                                mac: *mac,
                            },
                        },
                    );
                } else {
                    removed_neighs.push(*mac);
                }
            }
            for mac in removed_neighs {
                net.neighbors.remove(&mac);
                self.bus.publish(
                    ChangeKind::Removed,
                    &Layer2Event {
                        key: Layer2EntityKey::Neigh {
                            ifname: ifname.clone(),
                            mac,
                        },
                    },
                );
            }

            if net.touched {
                let kind = if net.is_new {
                    ChangeKind::Added
                } else {
                    ChangeKind::Changed
                };
                net.touched = false;
                net.is_new = false;
                self.bus.publish(
                    kind,
                    &Layer2Event {
                        key: Layer2EntityKey::Net {
                            ifname: ifname.clone(),
                        },
                    },
                );
            } else {
                removed_nets.push(ifname.clone());
            }
        }
        for ifname in removed_nets {
            self.nets.remove(&ifname);
            self.bus.publish(
                ChangeKind::Removed,
                &Layer2Event {
                    key: Layer2EntityKey::Net { ifname },
                },
            );
        }
    }

    // -- queries ---------------------------------------------------------

    pub fn query(&self, ifname: &str) -> Option<&Layer2Net> {
        self.net_get(ifname)
    }

    pub fn get_default_net(&self) -> Option<&Layer2Net> {
        self.nets.values().next()
    }

    /// Longest-prefix search over every neighbor's known remote IPs,
    /// matching the original's "which L2 neighbor announced this address"
    /// lookup used to correlate an NHDP link with its radio statistics.
    pub fn best_neighbor_for_ip(&self, addr: &NetAddr) -> Option<(&str, &Layer2Neigh)> {
        let mut best: Option<(&str, &Layer2Neigh, u8)> = None;
        for (ifname, net) in &self.nets {
            for neigh in net.neighbors.values() {
                for candidate in neigh.remote_ips() {
                    if !addrs_overlap(candidate, addr) {
                        continue;
                    }
                    let plen = candidate.prefix_len();
                    if best.map(|(_, _, best_plen)| plen > best_plen).unwrap_or(true) {
                        best = Some((ifname.as_str(), neigh, plen));
                    }
                }
            }
        }
        best.map(|(ifname, neigh, _)| (ifname, neigh))
    }
}

fn reset_slot_if_owned(slot: &mut crate::data::DataSlot, origin: &OriginHandle) {
    if slot.origin().map(|o| o.same_origin(origin)).unwrap_or(false) {
        slot.reset();
    }
}

fn addrs_overlap(candidate: &NetAddr, target: &NetAddr) -> bool {
    match (candidate.network(), target.as_ip()) {
        (Some(net), Some(ip)) => net.contains(ip),
        _ => candidate == target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::netaddr::NetAddr;
    use std::net::Ipv4Addr;

    fn mac(b: u8) -> Mac48 {
        Mac48([0, 0, 0, 0, 0, b])
    }

    #[test]
    fn origin_priority_gates_net_level_writes() {
        let mut db = Layer2Db::new();
        let low = db.origin_add("driver", 0, true);
        let high = db.origin_add("config", 10, false);

        db.net_add("wlan0");
        db.data_set_net("wlan0", &low, |d| &mut d.mtu, DataValue::fixed_point(1500, 1))
            .unwrap();
        let changed = db
            .data_set_net("wlan0", &high, |d| &mut d.mtu, DataValue::fixed_point(1400, 1))
            .unwrap();
        assert!(changed);
        assert_eq!(db.net_get("wlan0").unwrap().data.mtu.get_int64(1, 0), 1400);

        let rejected = db
            .data_set_net("wlan0", &low, |d| &mut d.mtu, DataValue::fixed_point(9999, 1))
            .unwrap();
        assert!(!rejected);
    }

    #[test]
    fn commit_removes_entries_not_refreshed() {
        let mut db = Layer2Db::new();
        let origin = db.origin_add("driver", 0, true);
        db.net_add("wlan0");
        db.neigh_add("wlan0", mac(1)).unwrap();
        db.data_set_neigh("wlan0", mac(1), &origin, |d| &mut d.tx_bitrate, DataValue::fixed_point(1000, 1))
            .unwrap();
        db.commit();
        assert!(db.neigh_get("wlan0", mac(1)).is_some());

        // second round: nothing touches the neighbor, so commit reaps it.
        db.commit();
        assert!(db.neigh_get("wlan0", mac(1)).is_none());
        // the net itself also wasn't touched this round.
        assert!(db.net_get("wlan0").is_none());
    }

    #[test]
    fn origin_remove_clears_only_its_own_slots() {
        let mut db = Layer2Db::new();
        let driver = db.origin_add("driver", 0, true);
        let config = db.origin_add("config", 10, false);
        db.net_add("wlan0");
        db.data_set_net("wlan0", &driver, |d| &mut d.mtu, DataValue::fixed_point(1500, 1))
            .unwrap();
        db.data_set_net("wlan0", &config, |d| &mut d.is_up, DataValue::Boolean(true))
            .unwrap();

        db.origin_remove(&driver);
        assert!(db.net_get("wlan0").unwrap().data.mtu.is_empty());
        assert!(db.net_get("wlan0").unwrap().data.is_up.get_bool(false));
    }

    #[test]
    fn best_neighbor_for_ip_prefers_longest_prefix() {
        let mut db = Layer2Db::new();
        db.net_add("wlan0");
        let n1 = db.neigh_add("wlan0", mac(1)).unwrap();
        n1.add_remote_ip(NetAddr::V4(
            ipnetwork::Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 0), 24).unwrap(),
        ));
        let n2 = db.neigh_add("wlan0", mac(2)).unwrap();
        n2.add_remote_ip(NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 5)));

        let target = NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 5));
        let (_, neigh) = db.best_neighbor_for_ip(&target).unwrap();
        assert_eq!(neigh.mac, mac(2));
    }
}
