use oonf_core::netaddr::{Mac48, NetAddr};

use crate::data::DataSlot;

/// Fixed data-slot indices on a [`Layer2Neigh`]: the handful of DAT-relevant
/// measurements this daemon consumes (spec.md §4.5's link-speed and
/// frame-loss inputs) plus signal strength, which nothing here computes but
/// which an `Origin` (e.g. a radio driver) may still publish.
#[derive(Debug, Default)]
pub struct Layer2NeighData {
    pub tx_bitrate: DataSlot,
    pub rx_bitrate: DataSlot,
    pub tx_frames: DataSlot,
    pub tx_retries: DataSlot,
    pub tx_failed: DataSlot,
    pub rx_signal_dbm: DataSlot,
}

/// A single-hop neighbor observed on a [`super::net::Layer2Net`], identified
/// by its MAC address. Carries the set of IP addresses reachable through it
/// so [`super::Layer2Db::best_neighbor_for_ip`] can do a longest-prefix
/// search without consulting NHDP.
#[derive(Debug, Default)]
pub struct Layer2Neigh {
    pub mac: Mac48,
    pub data: Layer2NeighData,
    remote_ips: Vec<NetAddr>,
    pub(crate) touched: bool,
    pub(crate) is_new: bool,
}

impl Layer2Neigh {
    pub fn new(mac: Mac48) -> Self {
        Self {
            mac,
            data: Layer2NeighData::default(),
            remote_ips: Vec::new(),
            touched: true,
            is_new: true,
        }
    }

    pub fn remote_ips(&self) -> &[NetAddr] {
        &self.remote_ips
    }

    pub fn add_remote_ip(&mut self, addr: NetAddr) {
        if !self.remote_ips.contains(&addr) {
            self.remote_ips.push(addr);
        }
    }

    pub fn remove_remote_ip(&mut self, addr: &NetAddr) {
        self.remote_ips.retain(|a| a != addr);
    }

    pub fn is_empty_of_data(&self) -> bool {
        self.data.tx_bitrate.is_empty()
            && self.data.rx_bitrate.is_empty()
            && self.data.tx_frames.is_empty()
            && self.data.tx_retries.is_empty()
            && self.data.tx_failed.is_empty()
            && self.data.rx_signal_dbm.is_empty()
            && self.remote_ips.is_empty()
    }
}
