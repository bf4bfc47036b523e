//! The topology-control (TC) graph (spec.md §4.8): one [`TcNode`] per
//! originator ever advertised, connected by [`TcEdge`]s carrying the
//! advertising ANSN and per-domain in/out metrics. Grounded on the
//! ANSN bookkeeping in
//! `examples/original_source/src/olsrv2/olsrv2/olsrv2_routing.c`.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::{Ipv4Network, Ipv6Network};
use oonf_core::arena::{Arena, Key};
use oonf_core::netaddr::NetAddr;
use oonf_core::serial::SerialU16;
use oonf_core::timer::TimerHandle;
use oonf_nhdp::constants::{
    METRIC_FLAG_INCOMING, METRIC_FLAG_NEIGHBOR_SCOPE, METRIC_FLAG_OUTGOING, MSG_TYPE_TC, TLV_ANSN, TLV_GATEWAY,
    TLV_LINK_METRIC, TLV_SRC_PREFIX,
};
use oonf_rfc5444::{decode_metric, encode_metric, AddrEntry, Message, Tlv, RFC7181_METRIC_INFINITE};

/// `TLV_SRC_PREFIX` value layout: a family tag byte, a prefix-length byte,
/// then the address octets. MAC48/EUI64 never occur as a source-specific
/// prefix, so only V4/V6 round-trip here.
fn encode_src_prefix(addr: &NetAddr) -> Option<Vec<u8>> {
    match addr {
        NetAddr::V4(n) => {
            let mut v = vec![0u8, n.prefix()];
            v.extend_from_slice(&n.ip().octets());
            Some(v)
        }
        NetAddr::V6(n) => {
            let mut v = vec![1u8, n.prefix()];
            v.extend_from_slice(&n.ip().octets());
            Some(v)
        }
        NetAddr::Mac48(_) | NetAddr::Eui64(_) => None,
    }
}

fn decode_src_prefix(bytes: &[u8]) -> Option<NetAddr> {
    let &family = bytes.first()?;
    let &prefix_len = bytes.get(1)?;
    match family {
        0 => {
            let b = bytes.get(2..6)?;
            let ip = Ipv4Addr::new(b[0], b[1], b[2], b[3]);
            Some(NetAddr::V4(Ipv4Network::new(ip, prefix_len).ok()?))
        }
        1 => {
            let b = bytes.get(2..18)?;
            let arr: [u8; 16] = b.try_into().ok()?;
            Some(NetAddr::V6(Ipv6Network::new(Ipv6Addr::from(arr), prefix_len).ok()?))
        }
        _ => None,
    }
}

pub struct TcNode {
    pub originator: NetAddr,
    pub ansn: SerialU16,
    pub validity_timer: Option<TimerHandle>,
    /// True while a live [`crate::linkset`]-equivalent NHDP neighbor
    /// shadows this node (spec.md §4.8's direct-neighbor flag).
    pub is_direct_neighbor: bool,
    pub source_specific: bool,
    /// True for a node that exists only as the target of someone else's
    /// edge/attachment, never itself advertised by a live TC — spec.md
    /// §4.8's "virtual node".
    pub is_virtual: bool,
    edges_out: Vec<Key<TcEdge>>,
    pub attachments: Vec<TcAttachment>,
}

impl TcNode {
    fn new(originator: NetAddr) -> Self {
        Self {
            originator,
            ansn: SerialU16::new(0),
            validity_timer: None,
            is_direct_neighbor: false,
            source_specific: false,
            is_virtual: true,
            edges_out: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn edges_out(&self) -> &[Key<TcEdge>] {
        &self.edges_out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TcAttachment {
    pub prefix: NetAddr,
    /// Source prefix for a source-specific attachment (spec.md §3's
    /// "destination endpoint (dst prefix, src prefix)"); `None` for an
    /// ordinary, non-source-specific announcement.
    pub src: Option<NetAddr>,
    pub distance: u8,
    pub metric: u32,
    pub ansn: SerialU16,
}

pub struct TcEdge {
    pub from: Key<TcNode>,
    pub to: Key<TcNode>,
    pub ansn: SerialU16,
    pub metric_in: u32,
    pub metric_out: u32,
    /// An edge kept alive only because the *other* node's own current
    /// advertisement still implies it, after this node's advertisement of
    /// it lapsed (spec.md §4.8: "the inverse back-pointer of each removed
    /// edge is left dangling as virtual if its other node still
    /// advertises this one").
    pub is_virtual: bool,
}

/// One advertised neighbor entry from a received TC message.
pub struct TcNeighborAdvert {
    pub originator: NetAddr,
    pub metric_in: u32,
    pub metric_out: u32,
}

/// Composes this node's TC (spec.md §4.8: "a full TC is composed from: the
/// neighbors advertised … plus all active LANs"), one address entry per
/// neighbor (carrying in/out `TLV_LINK_METRIC`) and one per attachment
/// (carrying `TLV_GATEWAY`'s distance plus its own metric), grounded on
/// `linkset.rs`'s `build_hello` TLV assembly.
pub fn build_tc_message(originator: NetAddr, ansn: SerialU16, neighbors: &[TcNeighborAdvert], attachments: &[TcAttachment]) -> Message {
    let mut msg = Message::new(MSG_TYPE_TC);
    msg.originator = Some(originator);
    msg.hop_limit = 255;
    msg.hop_count = 0;
    msg.msg_tlvs.push(Tlv::new(TLV_ANSN, ansn.0.to_be_bytes().to_vec()));

    for n in neighbors {
        let entry = AddrEntry::new(n.originator)
            .with_tlv(Tlv::new(TLV_LINK_METRIC, vec![encode_metric(n.metric_out), METRIC_FLAG_OUTGOING | METRIC_FLAG_NEIGHBOR_SCOPE]))
            .with_tlv(Tlv::new(TLV_LINK_METRIC, vec![encode_metric(n.metric_in), METRIC_FLAG_INCOMING | METRIC_FLAG_NEIGHBOR_SCOPE]));
        msg.addrs.push(entry);
    }
    for a in attachments {
        let mut entry = AddrEntry::new(a.prefix)
            .with_tlv(Tlv::new(TLV_GATEWAY, vec![a.distance]))
            .with_tlv(Tlv::new(TLV_LINK_METRIC, vec![encode_metric(a.metric), METRIC_FLAG_OUTGOING | METRIC_FLAG_NEIGHBOR_SCOPE]));
        if let Some(src) = a.src.and_then(|s| encode_src_prefix(&s)) {
            entry = entry.with_tlv(Tlv::new(TLV_SRC_PREFIX, src));
        }
        msg.addrs.push(entry);
    }
    msg
}

/// Inverse of [`build_tc_message`]; an address entry carrying `TLV_GATEWAY`
/// is an attachment, everything else is a neighbor advert. Returns `None`
/// for anything that isn't a well-formed TC (wrong `msg_type`, missing
/// originator or ANSN).
pub fn parse_tc_message(msg: &Message) -> Option<(NetAddr, SerialU16, Vec<TcNeighborAdvert>, Vec<TcAttachment>)> {
    if msg.msg_type != MSG_TYPE_TC {
        return None;
    }
    let originator = msg.originator?;
    let ansn_bytes: [u8; 2] = msg.msg_tlv(TLV_ANSN)?.value.as_slice().try_into().ok()?;
    let ansn = SerialU16::new(u16::from_be_bytes(ansn_bytes));

    let mut neighbors = Vec::new();
    let mut attachments = Vec::new();
    for addr in &msg.addrs {
        if let Some(gateway) = addr.tlv(TLV_GATEWAY) {
            let distance = *gateway.value.first().unwrap_or(&0);
            let metric = addr
                .tlv(TLV_LINK_METRIC)
                .and_then(|t| t.value.first())
                .map(|&b| decode_metric(b))
                .unwrap_or(RFC7181_METRIC_INFINITE);
            let src = addr.tlv(TLV_SRC_PREFIX).and_then(|t| decode_src_prefix(&t.value));
            attachments.push(TcAttachment { prefix: addr.addr, src, distance, metric, ansn });
        } else {
            let direction = |flag: u8| {
                addr.tlvs
                    .iter()
                    .find(|t| t.tlv_type == TLV_LINK_METRIC && t.value.get(1).map(|f| f & flag != 0).unwrap_or(false))
                    .and_then(|t| t.value.first())
                    .map(|&b| decode_metric(b))
            };
            let metric_out = direction(METRIC_FLAG_OUTGOING);
            let metric_in = direction(METRIC_FLAG_INCOMING);
            let metric_out = metric_out.or(metric_in).unwrap_or(RFC7181_METRIC_INFINITE);
            let metric_in = metric_in.unwrap_or(metric_out);
            neighbors.push(TcNeighborAdvert { originator: addr.addr, metric_in, metric_out });
        }
    }
    Some((originator, ansn, neighbors, attachments))
}

pub struct TcDb {
    pub nodes: Arena<TcNode>,
    pub edges: Arena<TcEdge>,
    by_originator: HashMap<NetAddr, Key<TcNode>>,
}

impl TcDb {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            edges: Arena::new(),
            by_originator: HashMap::new(),
        }
    }

    pub fn node_for(&self, originator: &NetAddr) -> Option<Key<TcNode>> {
        self.by_originator.get(originator).copied()
    }

    fn node_or_create(&mut self, originator: NetAddr) -> Key<TcNode> {
        if let Some(&key) = self.by_originator.get(&originator) {
            return key;
        }
        let key = self.nodes.insert(TcNode::new(originator));
        self.by_originator.insert(originator, key);
        key
    }

    /// Processes one received TC (spec.md §4.8's processing rules).
    /// Returns `false` if the ANSN was stale and the message was
    /// discarded; `true` if it was applied.
    pub fn process_tc(
        &mut self,
        originator: NetAddr,
        ansn: SerialU16,
        neighbors: &[TcNeighborAdvert],
        attachments: Vec<TcAttachment>,
    ) -> bool {
        let node_key = self.node_or_create(originator);
        {
            let node = self.nodes.get(node_key).expect("just created or found");
            if !node.is_virtual && ansn.is_before(node.ansn) {
                return false;
            }
        }

        let new_targets: HashMap<NetAddr, &TcNeighborAdvert> =
            neighbors.iter().map(|n| (n.originator, n)).collect();

        let existing_edges = self.nodes.get(node_key).expect("exists").edges_out().to_vec();
        let mut kept = Vec::new();
        for edge_key in existing_edges {
            let Some(edge) = self.edges.get(edge_key) else { continue };
            let to_originator = self.nodes.get(edge.to).map(|n| n.originator);
            let still_advertised = to_originator.map(|o| new_targets.contains_key(&o)).unwrap_or(false);
            if still_advertised {
                kept.push(edge_key);
                continue;
            }
            // Removed from this node's advertisement. Check whether the
            // far node still advertises a reverse edge back to us: if so
            // keep this edge around as virtual instead of deleting the
            // graph connectivity outright.
            let other_still_points_back = to_originator
                .and_then(|o| self.node_for(&o))
                .map(|other_key| {
                    self.nodes
                        .get(other_key)
                        .map(|other| other.edges_out().iter().any(|&e| self.edges.get(e).map(|e| e.to) == Some(node_key)))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if other_still_points_back {
                if let Some(edge) = self.edges.get_mut(edge_key) {
                    edge.is_virtual = true;
                }
                kept.push(edge_key);
            } else {
                self.edges.remove(edge_key);
            }
        }

        for advert in neighbors {
            let to_key = self.node_or_create(advert.originator);
            let existing = kept.iter().find(|&&e| self.edges.get(e).map(|e| e.to) == Some(to_key)).copied();
            match existing {
                Some(edge_key) => {
                    if let Some(edge) = self.edges.get_mut(edge_key) {
                        edge.ansn = ansn;
                        edge.metric_in = advert.metric_in;
                        edge.metric_out = advert.metric_out;
                        edge.is_virtual = false;
                    }
                }
                None => {
                    let edge_key = self.edges.insert(TcEdge {
                        from: node_key,
                        to: to_key,
                        ansn,
                        metric_in: advert.metric_in,
                        metric_out: advert.metric_out,
                        is_virtual: false,
                    });
                    kept.push(edge_key);
                }
            }
        }

        let node = self.nodes.get_mut(node_key).expect("exists");
        node.ansn = ansn;
        node.is_virtual = false;
        node.edges_out = kept;
        node.attachments = attachments;
        true
    }

    /// Flips a node's direct-neighbor flag (NHDP neighbor appeared or
    /// vanished); callers mark the owning domain dirty on change.
    pub fn set_direct_neighbor(&mut self, originator: NetAddr, is_direct: bool) -> Key<TcNode> {
        let key = self.node_or_create(originator);
        if let Some(node) = self.nodes.get_mut(key) {
            node.is_direct_neighbor = is_direct;
        }
        key
    }

    /// Removes a node that has neither a live advertisement nor any
    /// remaining inbound edge: the orphaned-virtual sweep spec.md §4.8
    /// schedules as a delayed re-check.
    pub fn sweep_orphaned_virtuals(&mut self) {
        let candidates: Vec<Key<TcNode>> =
            self.nodes.iter().filter(|(_, n)| n.is_virtual).map(|(k, _)| k).collect();
        for key in candidates {
            let has_inbound = self.edges.iter().any(|(_, e)| e.to == key);
            if !has_inbound {
                if let Some(node) = self.nodes.get(key) {
                    self.by_originator.remove(&node.originator);
                }
                let edges: Vec<Key<TcEdge>> = self
                    .nodes
                    .get(key)
                    .map(|n| n.edges_out().to_vec())
                    .unwrap_or_default();
                for e in edges {
                    self.edges.remove(e);
                }
                self.nodes.remove(key);
            }
        }
    }
}

impl Default for TcDb {
    fn default() -> Self {
        Self::new()
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
    fn stale_ansn_is_discarded() {
        let mut db = TcDb::new();
        let n = addr(1);
        assert!(db.process_tc(n, SerialU16::new(5), &[], vec![]));
        assert!(!db.process_tc(n, SerialU16::new(4), &[], vec![]));
        assert_eq!(db.nodes.get(db.node_for(&n).unwrap()).unwrap().ansn, SerialU16::new(5));
    }

    #[test]
    fn edge_dropped_when_neither_side_advertises_it() {
        let mut db = TcDb::new();
        let a = addr(1);
        let b = addr(2);
        db.process_tc(a, SerialU16::new(1), &[TcNeighborAdvert { originator: b, metric_in: 10, metric_out: 10 }], vec![]);
        let node_a = db.node_for(&a).unwrap();
        assert_eq!(db.nodes.get(node_a).unwrap().edges_out().len(), 1);

        db.process_tc(a, SerialU16::new(2), &[], vec![]);
        assert_eq!(db.nodes.get(node_a).unwrap().edges_out().len(), 0);
    }

    #[test]
    fn edge_survives_as_virtual_when_peer_still_advertises_back() {
        let mut db = TcDb::new();
        let a = addr(1);
        let b = addr(2);
        db.process_tc(a, SerialU16::new(1), &[TcNeighborAdvert { originator: b, metric_in: 10, metric_out: 10 }], vec![]);
        db.process_tc(b, SerialU16::new(1), &[TcNeighborAdvert { originator: a, metric_in: 10, metric_out: 10 }], vec![]);

        // a stops advertising b, but b still advertises a.
        db.process_tc(a, SerialU16::new(2), &[], vec![]);

        let node_a = db.node_for(&a).unwrap();
        let edges = db.nodes.get(node_a).unwrap().edges_out();
        assert_eq!(edges.len(), 1);
        assert!(db.edges.get(edges[0]).unwrap().is_virtual);
    }

    #[test]
    fn direct_neighbor_flag_creates_a_virtual_node_if_absent() {
        let mut db = TcDb::new();
        let n = addr(3);
        let key = db.set_direct_neighbor(n, true);
        assert!(db.nodes.get(key).unwrap().is_direct_neighbor);
        assert!(db.nodes.get(key).unwrap().is_virtual);
    }

    fn v4(last: u8) -> NetAddr {
        NetAddr::host_v4(std::net::Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn tc_message_round_trips_neighbors_and_attachments() {
        let originator = v4(1);
        let neighbor = v4(2);
        let attachment = NetAddr::V4(ipnetwork::Ipv4Network::new(std::net::Ipv4Addr::new(10, 1, 0, 0), 16).unwrap());
        let neighbors = vec![TcNeighborAdvert { originator: neighbor, metric_in: 50, metric_out: 75 }];
        let attachments = vec![TcAttachment { prefix: attachment, src: None, distance: 1, metric: 30, ansn: SerialU16::new(9) }];

        let msg = build_tc_message(originator, SerialU16::new(9), &neighbors, &attachments);
        let (parsed_originator, parsed_ansn, parsed_neighbors, parsed_attachments) = parse_tc_message(&msg).unwrap();

        assert_eq!(parsed_originator, originator);
        assert_eq!(parsed_ansn, SerialU16::new(9));
        assert_eq!(parsed_neighbors.len(), 1);
        assert_eq!(parsed_neighbors[0].originator, neighbor);
        assert!(parsed_neighbors[0].metric_out.abs_diff(75) <= 5);
        assert_eq!(parsed_attachments.len(), 1);
        assert_eq!(parsed_attachments[0].prefix, attachment);
        assert_eq!(parsed_attachments[0].distance, 1);
    }

    #[test]
    fn source_specific_attachment_src_prefix_round_trips() {
        let originator = v4(1);
        let dst = NetAddr::V6(ipnetwork::Ipv6Network::new(std::net::Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32).unwrap());
        let src = NetAddr::V6(ipnetwork::Ipv6Network::new(std::net::Ipv6Addr::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 0), 48).unwrap());
        let attachments = vec![TcAttachment { prefix: dst, src: Some(src), distance: 0, metric: 20, ansn: SerialU16::new(1) }];

        let msg = build_tc_message(originator, SerialU16::new(1), &[], &attachments);
        let (_, _, _, parsed_attachments) = parse_tc_message(&msg).unwrap();

        assert_eq!(parsed_attachments.len(), 1);
        assert_eq!(parsed_attachments[0].src, Some(src));
    }

    #[test]
    fn non_tc_message_is_rejected() {
        let msg = Message::new(99);
        assert!(parse_tc_message(&msg).is_none());
    }
}
