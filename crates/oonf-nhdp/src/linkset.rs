//! `NHDPInterface` (spec.md §4.5): owns one interface's links, neighbors
//! and two-hop set, emits HELLOs on an interval timer and applies
//! received HELLOs to the link FSM. Grounded on the link/twohop
//! processing in `examples/original_source/src/nhdp/nhdp/nhdp_domain.c`.

use std::collections::HashMap;

use oonf_core::arena::{Arena, Key};
use oonf_core::netaddr::NetAddr;
use oonf_core::timer::{TimerHandle, TimerWheel};
use oonf_rfc5444::{Message, Tlv};

use crate::constants::{
    LINK_STATUS_HEARD, LINK_STATUS_LOST, LINK_STATUS_SYMMETRIC, MSG_TYPE_HELLO, NEIGHB_STATUS_NOT_SYMMETRIC,
    NEIGHB_STATUS_SYMMETRIC, TLV_INTERVAL_TIME, TLV_LINK_STATUS, TLV_OTHER_NEIGHB, TLV_VALIDITY_TIME, TLV_WILLINGNESS,
};
use crate::domain::DomainId;
use crate::link::NhdpLink;
use crate::mpr::MprDirtyFlag;
use crate::neighbor::Neighbor;
use crate::twohop::TwoHopEntry;

pub struct NhdpInterface {
    pub ifname: String,
    pub local_addrs: Vec<NetAddr>,

    pub links: Arena<NhdpLink>,
    pub neighbors: Arena<Neighbor>,
    pub twohop: Arena<TwoHopEntry>,
    /// One link per far-end address heard on this interface.
    by_addr: HashMap<NetAddr, Key<NhdpLink>>,

    pub hello_timer: TimerHandle,
    pub interval_time_ms: u64,
    pub validity_time_ms: u64,

    pub willingness: HashMap<DomainId, u8>,
    pub mpr_dirty: HashMap<DomainId, MprDirtyFlag>,
}

impl NhdpInterface {
    pub fn new(ifname: impl Into<String>, wheel: &mut TimerWheel) -> Self {
        Self {
            ifname: ifname.into(),
            local_addrs: Vec::new(),
            links: Arena::new(),
            neighbors: Arena::new(),
            twohop: Arena::new(),
            by_addr: HashMap::new(),
            hello_timer: wheel.create(),
            interval_time_ms: 2000,
            validity_time_ms: 6000,
            willingness: HashMap::new(),
            mpr_dirty: HashMap::new(),
        }
    }

    pub fn arm_hello_timer(&self, wheel: &mut TimerWheel) {
        wheel.set(self.hello_timer, self.interval_time_ms, Some(self.interval_time_ms));
    }

    pub fn mark_domain_dirty(&mut self, domain: DomainId) {
        self.mpr_dirty.entry(domain).or_default().mark_dirty();
    }

    fn link_or_create(&mut self, addr: NetAddr) -> Key<NhdpLink> {
        if let Some(&key) = self.by_addr.get(&addr) {
            return key;
        }
        let key = self.links.insert(NhdpLink::new(addr));
        self.by_addr.insert(addr, key);
        key
    }

    pub fn link_for(&self, addr: &NetAddr) -> Option<Key<NhdpLink>> {
        self.by_addr.get(addr).copied()
    }

    /// Builds this interface's next HELLO (spec.md §4.5): validity/interval
    /// time, advertised local addresses, each known link's address with its
    /// link-status/neighbor-status bits, and per-domain willingness.
    pub fn build_hello(&self, originator: Option<NetAddr>) -> Message {
        let mut msg = Message::new(MSG_TYPE_HELLO);
        msg.originator = originator;
        msg.hop_limit = 1;
        msg.hop_count = 0;

        msg.msg_tlvs.push(Tlv::new(TLV_VALIDITY_TIME, self.validity_time_ms.to_be_bytes().to_vec()));
        msg.msg_tlvs.push(Tlv::new(TLV_INTERVAL_TIME, self.interval_time_ms.to_be_bytes().to_vec()));
        for (domain, &willingness) in &self.willingness {
            msg.msg_tlvs.push(Tlv::with_ext(TLV_WILLINGNESS, domain.0, vec![willingness]));
        }

        for (&addr, &link_key) in &self.by_addr {
            let Some(link) = self.links.get(link_key) else { continue };
            let status_byte = match link.status {
                crate::link::LinkStatus::Pending => LINK_STATUS_HEARD,
                crate::link::LinkStatus::Heard => LINK_STATUS_HEARD,
                crate::link::LinkStatus::Symmetric => LINK_STATUS_SYMMETRIC,
                crate::link::LinkStatus::Lost => LINK_STATUS_LOST,
            };
            let neigh_status = link
                .neighbor
                .and_then(|nk| self.neighbors.get(nk))
                .map(|n| if n.is_symmetric() { NEIGHB_STATUS_SYMMETRIC } else { NEIGHB_STATUS_NOT_SYMMETRIC })
                .unwrap_or(NEIGHB_STATUS_NOT_SYMMETRIC);

            let entry = oonf_rfc5444::AddrEntry::new(addr)
                .with_tlv(Tlv::new(TLV_LINK_STATUS, vec![status_byte]))
                .with_tlv(Tlv::new(TLV_OTHER_NEIGHB, vec![neigh_status]));
            msg.addrs.push(entry);
        }

        msg
    }

    /// Applies a received HELLO (spec.md §4.5's transition rules) from
    /// `sender`. Returns the link key the sender now maps to.
    pub fn process_hello(&mut self, sender: NetAddr, msg: &Message, wheel: &mut TimerWheel) -> Key<NhdpLink> {
        let link_key = self.link_or_create(sender);

        let names_us = self.local_addrs.iter().any(|local| {
            msg.addrs.iter().any(|a| {
                &a.addr == local
                    && a.tlv(TLV_LINK_STATUS).map(|t| t.value.first().copied()) == Some(Some(LINK_STATUS_SYMMETRIC))
            })
        });

        let link = self.links.get_mut(link_key).expect("just created or found");
        if link.sym_timer.is_none() {
            link.sym_timer = Some(wheel.create());
        }
        if link.heard_timer.is_none() {
            link.heard_timer = Some(wheel.create());
        }
        if link.validity_timer.is_none() {
            link.validity_timer = Some(wheel.create());
        }

        if names_us {
            link.on_heard_as_symmetric();
            wheel.set(link.sym_timer.unwrap(), self.validity_time_ms, None);
        } else {
            link.on_heard();
            wheel.set(link.heard_timer.unwrap(), self.validity_time_ms, None);
        }
        wheel.set(link.validity_timer.unwrap(), self.validity_time_ms * 3, None);

        if let Some(seqno) = msg.seqno {
            link.dat.on_packet_received(seqno.0);
            link.last_packet_seqno = Some(seqno.0);
        }

        if names_us {
            self.update_twohop_set(link_key, sender, msg, wheel);
        }

        link_key
    }

    /// Refreshes the two-hop set reachable via `link_key` from a HELLO that
    /// named us symmetric: every other address the sender lists as
    /// symmetric is reachable from us in two hops (spec.md §3's
    /// TwoHopEntry; RFC6130's N2 set).
    fn update_twohop_set(&mut self, link_key: Key<NhdpLink>, sender: NetAddr, msg: &Message, wheel: &mut TimerWheel) {
        let far_addrs: Vec<NetAddr> = msg
            .addrs
            .iter()
            .filter(|a| a.addr != sender)
            .filter(|a| !self.local_addrs.contains(&a.addr))
            .filter(|a| a.tlv(TLV_LINK_STATUS).map(|t| t.value.first().copied()) == Some(Some(LINK_STATUS_SYMMETRIC)))
            .map(|a| a.addr)
            .collect();

        for far_addr in far_addrs {
            let existing = self
                .twohop
                .iter()
                .find(|(_, entry)| entry.via_link == link_key && entry.far_addr == far_addr)
                .map(|(key, _)| key);

            let entry_key = existing.unwrap_or_else(|| self.twohop.insert(TwoHopEntry::new(far_addr, link_key)));
            let entry = self.twohop.get_mut(entry_key).expect("just found or inserted");
            entry.same_interface = self.by_addr.contains_key(&far_addr);
            if entry.validity_timer.is_none() {
                entry.validity_timer = Some(wheel.create());
            }
            wheel.set(entry.validity_timer.unwrap(), self.validity_time_ms, None);
        }
    }

    pub fn on_sym_timeout(&mut self, link: Key<NhdpLink>) {
        if let Some(l) = self.links.get_mut(link) {
            l.on_sym_timeout();
        }
    }

    pub fn on_heard_timeout(&mut self, link: Key<NhdpLink>) {
        if let Some(l) = self.links.get_mut(link) {
            l.on_heard_timeout();
        }
    }

    pub fn remove_link(&mut self, link: Key<NhdpLink>) {
        if let Some(l) = self.links.get(link) {
            self.by_addr.remove(&l.remote_addr);
        }
        self.links.remove(link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::netaddr::Mac48;

    fn addr(last: u8) -> NetAddr {
        NetAddr::Mac48(Mac48([0, 0, 0, 0, 0, last]))
    }

    #[test]
    fn build_hello_advertises_known_links() {
        let mut wheel = TimerWheel::new(0);
        let mut iface = NhdpInterface::new("wlan0", &mut wheel);
        iface.link_or_create(addr(1));

        let hello = iface.build_hello(None);
        assert_eq!(hello.msg_type, MSG_TYPE_HELLO);
        assert_eq!(hello.addrs.len(), 1);
        assert_eq!(hello.addrs[0].addr, addr(1));
    }

    #[test]
    fn hello_naming_us_as_symmetric_promotes_the_link() {
        let mut wheel = TimerWheel::new(0);
        let mut iface = NhdpInterface::new("wlan0", &mut wheel);
        iface.local_addrs.push(addr(1));

        let mut hello = Message::new(MSG_TYPE_HELLO);
        hello.addrs.push(
            oonf_rfc5444::AddrEntry::new(addr(1)).with_tlv(Tlv::new(TLV_LINK_STATUS, vec![LINK_STATUS_SYMMETRIC])),
        );

        let link_key = iface.process_hello(addr(2), &hello, &mut wheel);
        assert!(iface.links.get(link_key).unwrap().is_symmetric());
    }

    #[test]
    fn hello_naming_us_symmetric_exposes_senders_other_symmetric_neighbors() {
        let mut wheel = TimerWheel::new(0);
        let mut iface = NhdpInterface::new("wlan0", &mut wheel);
        iface.local_addrs.push(addr(1));

        let mut hello = Message::new(MSG_TYPE_HELLO);
        hello.addrs.push(
            oonf_rfc5444::AddrEntry::new(addr(1)).with_tlv(Tlv::new(TLV_LINK_STATUS, vec![LINK_STATUS_SYMMETRIC])),
        );
        hello.addrs.push(
            oonf_rfc5444::AddrEntry::new(addr(3)).with_tlv(Tlv::new(TLV_LINK_STATUS, vec![LINK_STATUS_SYMMETRIC])),
        );

        let link_key = iface.process_hello(addr(2), &hello, &mut wheel);
        assert_eq!(iface.twohop.len(), 1);
        let (_, entry) = iface.twohop.iter().next().unwrap();
        assert_eq!(entry.far_addr, addr(3));
        assert_eq!(entry.via_link, link_key);
        assert!(!entry.same_interface);
    }

    #[test]
    fn hello_not_naming_us_symmetric_does_not_populate_twohop_set() {
        let mut wheel = TimerWheel::new(0);
        let mut iface = NhdpInterface::new("wlan0", &mut wheel);
        iface.local_addrs.push(addr(1));

        let mut hello = Message::new(MSG_TYPE_HELLO);
        hello.addrs.push(
            oonf_rfc5444::AddrEntry::new(addr(3)).with_tlv(Tlv::new(TLV_LINK_STATUS, vec![LINK_STATUS_SYMMETRIC])),
        );

        iface.process_hello(addr(2), &hello, &mut wheel);
        assert!(iface.twohop.is_empty());
    }

    #[test]
    fn hello_not_naming_us_only_reaches_heard() {
        let mut wheel = TimerWheel::new(0);
        let mut iface = NhdpInterface::new("wlan0", &mut wheel);
        iface.local_addrs.push(addr(1));

        let hello = Message::new(MSG_TYPE_HELLO);
        let link_key = iface.process_hello(addr(2), &hello, &mut wheel);
        let link = iface.links.get(link_key).unwrap();
        assert!(!link.is_symmetric());
        assert_eq!(link.status, crate::link::LinkStatus::Heard);
    }
}
