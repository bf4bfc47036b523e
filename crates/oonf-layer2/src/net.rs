use oonf_core::netaddr::Mac48;

use crate::data::DataSlot;
use crate::neigh::Layer2Neigh;

/// Fixed data-slot indices on a [`Layer2Net`]. The original keeps these as
/// an open enum of "network data" keys (link speed, MTU, DLEP radio type);
/// this daemon only ever reads a handful of them, so they're named fields
/// instead of a second indirection layer.
#[derive(Debug, Default)]
pub struct Layer2NetData {
    pub tx_max_bitrate: DataSlot,
    pub rx_max_bitrate: DataSlot,
    pub mtu: DataSlot,
    pub is_up: DataSlot,
}

/// A network interface as seen by Layer2: identified by interface name,
/// owning zero or more [`Layer2Neigh`] entries keyed by MAC address.
#[derive(Debug, Default)]
pub struct Layer2Net {
    pub ifname: String,
    pub local_mac: Option<Mac48>,
    pub data: Layer2NetData,
    pub(crate) neighbors: std::collections::BTreeMap<Mac48, Layer2Neigh>,
    pub(crate) touched: bool,
    pub(crate) is_new: bool,
}

impl Layer2Net {
    pub fn new(ifname: impl Into<String>) -> Self {
        Self {
            ifname: ifname.into(),
            local_mac: None,
            data: Layer2NetData::default(),
            neighbors: std::collections::BTreeMap::new(),
            touched: true,
            is_new: true,
        }
    }

    pub fn neighbor(&self, mac: Mac48) -> Option<&Layer2Neigh> {
        self.neighbors.get(&mac)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &Layer2Neigh> {
        self.neighbors.values()
    }

    pub fn is_empty_of_data(&self) -> bool {
        self.data.tx_max_bitrate.is_empty()
            && self.data.rx_max_bitrate.is_empty()
            && self.data.mtu.is_empty()
            && self.data.is_up.is_empty()
    }
}
