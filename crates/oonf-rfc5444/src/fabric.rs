//! `RFC5444Fabric` (spec.md §4.3): per-target message aggregation, packet
//! sequence numbering, duplicate suppression and message forwarding. One
//! fabric instance is shared by every registered protocol extension
//! (NHDP, OLSRv2 TC); extensions enqueue messages and the fabric decides
//! when to flush them as packets.

use std::collections::{HashSet, VecDeque};

use oonf_core::netaddr::NetAddr;
use oonf_core::serial::SerialU16;
use oonf_core::timer::{TimerHandle, TimerWheel};

use crate::packet::{Message, Packet};

/// Opaque identifier for an aggregation target: in practice an interface
/// name plus an addressing scope (e.g. `"wlan0/mcast"`, `"wlan0/unicast"`).
/// The fabric itself never interprets the string; `oonf-socket` maps it to
/// a concrete socket.
pub type TargetId = String;

const DEFAULT_AGGREGATION_MS: u64 = 100;

/// Bounded LRU membership test keyed by `(originator, seqno)`, used for
/// both the processed-message and forwarded-message duplicate sets (spec.md
/// §4.3). Eviction is FIFO once `capacity` is exceeded, matching the
/// original's fixed-size duplicate history rather than a TTL.
pub struct DuplicateSet {
    capacity: usize,
    order: VecDeque<(NetAddr, u16)>,
    seen: HashSet<(NetAddr, u16)>,
}

impl DuplicateSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `true` and records the pair if this is the first time it's
    /// been seen; returns `false` (a duplicate) otherwise.
    pub fn admit(&mut self, originator: NetAddr, seqno: SerialU16) -> bool {
        let key = (originator, seqno.0);
        if !self.seen.insert(key) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DuplicateSet {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Externally-supplied forwarding policy: the fabric asks whether the local
/// node is a flooding MPR for the message's sender (NHDP's job to know) and
/// which targets flooded messages go out on.
pub trait ForwardingPolicy {
    fn is_flooding_mpr_for(&self, sender: &NetAddr) -> bool;
    fn flooding_targets(&self) -> Vec<TargetId>;
}

/// Invoked for every inbound message, in ascending priority order. A
/// consumer returns `true` to stop propagation to lower-priority consumers.
pub trait TlvBlockConsumer {
    fn priority(&self) -> i32;
    fn consume(&mut self, msg: &Message) -> bool;
}

struct RegisteredConsumer {
    priority: i32,
    consumer: Box<dyn TlvBlockConsumer>,
}

struct TargetState {
    pending: Vec<Message>,
    aggregation_timer: TimerHandle,
    aggregation_ms: u64,
    seqno_enabled: bool,
}

/// One logical RFC5444 protocol instance (spec.md calls this "per Protocol,
/// e.g. OLSRv2"): owns the message/packet sequence counters, the duplicate
/// sets, the consumer list and the per-target aggregation queues.
pub struct Rfc5444Fabric {
    message_seqno: SerialU16,
    packet_seqno: SerialU16,
    processed: DuplicateSet,
    forwarded: DuplicateSet,
    consumers: Vec<RegisteredConsumer>,
    targets: std::collections::HashMap<TargetId, TargetState>,
}

impl Default for Rfc5444Fabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Rfc5444Fabric {
    pub fn new() -> Self {
        Self {
            message_seqno: SerialU16::new(0),
            packet_seqno: SerialU16::new(0),
            processed: DuplicateSet::default(),
            forwarded: DuplicateSet::default(),
            consumers: Vec::new(),
            targets: std::collections::HashMap::new(),
        }
    }

    pub fn next_message_seqno(&mut self) -> SerialU16 {
        self.message_seqno = self.message_seqno.next();
        self.message_seqno
    }

    fn next_packet_seqno(&mut self) -> SerialU16 {
        self.packet_seqno = self.packet_seqno.next();
        self.packet_seqno
    }

    /// Registers a consumer, keeping the list sorted by ascending priority;
    /// among equal priorities, registration order is preserved.
    pub fn register_consumer(&mut self, consumer: Box<dyn TlvBlockConsumer>) {
        let priority = consumer.priority();
        let pos = self
            .consumers
            .iter()
            .position(|r| r.priority > priority)
            .unwrap_or(self.consumers.len());
        self.consumers.insert(pos, RegisteredConsumer { priority, consumer });
    }

    /// Enables or disables the packet sequence number TLV for `target`, by
    /// reference count: any caller wanting it keeps it enabled until every
    /// caller has released it. Simplified here to a plain enable flag since
    /// this daemon only has one caller per target (DAT's packet-loss
    /// tracker).
    pub fn set_seqno_enabled(&mut self, target: &TargetId, enabled: bool, wheel: &mut TimerWheel) {
        let state = self.ensure_target(target, wheel);
        state.seqno_enabled = enabled;
    }

    fn ensure_target<'a>(&'a mut self, target: &TargetId, wheel: &mut TimerWheel) -> &'a mut TargetState {
        if !self.targets.contains_key(target) {
            let timer = wheel.create();
            self.targets.insert(
                target.clone(),
                TargetState {
                    pending: Vec::new(),
                    aggregation_timer: timer,
                    aggregation_ms: DEFAULT_AGGREGATION_MS,
                    seqno_enabled: false,
                },
            );
        }
        self.targets.get_mut(target).expect("just inserted")
    }

    pub fn set_aggregation_interval(&mut self, target: &TargetId, ms: u64, wheel: &mut TimerWheel) {
        self.ensure_target(target, wheel).aggregation_ms = ms;
    }

    /// Enqueues `message` for `target` and arms its aggregation timer if
    /// this is the first message queued since the last flush (spec.md
    /// §4.3's "on any extension calling 'message generated'").
    pub fn generate_message(&mut self, target: &TargetId, message: Message, wheel: &mut TimerWheel) {
        let state = self.ensure_target(target, wheel);
        let was_empty = state.pending.is_empty();
        state.pending.push(message);
        if was_empty {
            wheel.set(state.aggregation_timer, state.aggregation_ms, None);
        }
    }

    /// Called when `timer` fires; if it's a target's aggregation timer,
    /// drains its queue into one packet and returns it for `oonf-socket`
    /// to send. Returns `None` for timers this fabric doesn't own.
    pub fn flush_on_timer(&mut self, timer: TimerHandle) -> Option<(TargetId, Packet)> {
        let target_id = self
            .targets
            .iter()
            .find(|(_, s)| s.aggregation_timer == timer)
            .map(|(id, _)| id.clone())?;
        self.flush(&target_id)
    }

    /// Unconditionally flushes `target`'s pending messages as one packet,
    /// even if its aggregation timer hasn't fired yet (used for urgent
    /// sends that shorten the interval to zero).
    pub fn flush(&mut self, target: &TargetId) -> Option<(TargetId, Packet)> {
        let state = self.targets.get_mut(target)?;
        if state.pending.is_empty() {
            return None;
        }
        let messages = std::mem::take(&mut state.pending);
        let seqno_enabled = state.seqno_enabled;
        let seqno = if seqno_enabled {
            Some(self.next_packet_seqno())
        } else {
            None
        };
        Some((target.clone(), Packet { seqno, messages }))
    }

    /// Processes one inbound packet: runs every message through the
    /// consumer chain in priority order, then applies the forwarding
    /// predicate. `sender` is the link-local source address the packet
    /// arrived from (used for the flooding-MPR check and deduplication);
    /// `on_unicast_iface` mirrors spec.md §4.3's link-local source filter
    /// on the "unicast" virtual interface.
    pub fn receive_packet(
        &mut self,
        packet: &Packet,
        sender: NetAddr,
        on_unicast_iface: bool,
        policy: &impl ForwardingPolicy,
        wheel: &mut TimerWheel,
    ) -> Vec<Message> {
        if on_unicast_iface && sender.is_link_local() {
            return Vec::new();
        }

        let mut to_forward = Vec::new();
        for msg in &packet.messages {
            for reg in self.consumers.iter_mut() {
                if reg.consumer.consume(msg) {
                    break;
                }
            }

            if let (Some(originator), Some(seqno)) = (msg.originator, msg.seqno) {
                self.processed.admit(originator, seqno);
                if msg.forwardable()
                    && policy.is_flooding_mpr_for(&sender)
                    && self.forwarded.admit(originator, seqno)
                {
                    let mut forwarded_msg = msg.clone();
                    forwarded_msg.hop_count += 1;
                    for target in policy.flooding_targets() {
                        self.generate_message(&target, forwarded_msg.clone(), wheel);
                    }
                    to_forward.push(forwarded_msg);
                }
            }
        }
        to_forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct AlwaysFlood;
    impl ForwardingPolicy for AlwaysFlood {
        fn is_flooding_mpr_for(&self, _sender: &NetAddr) -> bool {
            true
        }
        fn flooding_targets(&self) -> Vec<TargetId> {
            vec!["wlan0/mcast".to_string()]
        }
    }

    struct NeverFlood;
    impl ForwardingPolicy for NeverFlood {
        fn is_flooding_mpr_for(&self, _sender: &NetAddr) -> bool {
            false
        }
        fn flooding_targets(&self) -> Vec<TargetId> {
            vec![]
        }
    }

    fn sample_message(originator: Ipv4Addr, seqno: u16) -> Message {
        let mut msg = Message::new(3);
        msg.originator = Some(NetAddr::host_v4(originator));
        msg.seqno = Some(SerialU16::new(seqno));
        msg.hop_limit = 4;
        msg.hop_count = 1;
        msg
    }

    #[test]
    fn generating_a_message_arms_and_flushes_the_aggregation_timer() {
        let mut fabric = Rfc5444Fabric::new();
        let mut wheel = TimerWheel::new(0);
        let target = "wlan0/mcast".to_string();

        fabric.generate_message(&target, Message::new(1), &mut wheel);
        assert!(wheel.advance_to(50).is_empty());
        let fired = wheel.advance_to(100);
        assert_eq!(fired.len(), 1);
        let (flushed_target, packet) = fabric.flush_on_timer(fired[0]).unwrap();
        assert_eq!(flushed_target, target);
        assert_eq!(packet.messages.len(), 1);
    }

    #[test]
    fn duplicate_messages_are_not_forwarded_twice() {
        let mut fabric = Rfc5444Fabric::new();
        let mut wheel = TimerWheel::new(0);
        let sender = NetAddr::host_v4(Ipv4Addr::new(192, 168, 0, 1));
        let packet = Packet {
            seqno: None,
            messages: vec![sample_message(Ipv4Addr::new(10, 0, 0, 1), 5)],
        };

        let first = fabric.receive_packet(&packet, sender, false, &AlwaysFlood, &mut wheel);
        assert_eq!(first.len(), 1);
        let second = fabric.receive_packet(&packet, sender, false, &AlwaysFlood, &mut wheel);
        assert!(second.is_empty());
    }

    #[test]
    fn non_mpr_does_not_forward() {
        let mut fabric = Rfc5444Fabric::new();
        let mut wheel = TimerWheel::new(0);
        let sender = NetAddr::host_v4(Ipv4Addr::new(192, 168, 0, 1));
        let packet = Packet {
            seqno: None,
            messages: vec![sample_message(Ipv4Addr::new(10, 0, 0, 1), 5)],
        };
        let forwarded = fabric.receive_packet(&packet, sender, false, &NeverFlood, &mut wheel);
        assert!(forwarded.is_empty());
    }

    #[test]
    fn link_local_source_is_filtered_on_the_unicast_interface() {
        let mut fabric = Rfc5444Fabric::new();
        let mut wheel = TimerWheel::new(0);
        let sender = NetAddr::host_v4(Ipv4Addr::new(169, 254, 1, 1));
        let packet = Packet {
            seqno: None,
            messages: vec![sample_message(Ipv4Addr::new(10, 0, 0, 1), 5)],
        };
        let forwarded = fabric.receive_packet(&packet, sender, true, &AlwaysFlood, &mut wheel);
        assert!(forwarded.is_empty());
    }
}
