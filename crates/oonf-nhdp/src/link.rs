//! Per-link NHDP state machine (spec.md §4.5): `{Pending, Heard,
//! Symmetric, Lost}`, driven by HELLO receipt and three timers, grounded
//! on the link status transitions in
//! `examples/original_source/src/nhdp/nhdp/nhdp_domain.c`.

use std::collections::HashMap;

use oonf_core::arena::Key;
use oonf_core::netaddr::NetAddr;
use oonf_core::timer::TimerHandle;
use oonf_rfc5444::RFC7181_METRIC_INFINITE;

use crate::dat::DatMetric;
use crate::domain::DomainId;
use crate::neighbor::Neighbor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
    Heard,
    Symmetric,
    Lost,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMetric {
    pub metric_in: u32,
    pub metric_out: u32,
}

impl LinkMetric {
    fn infinite() -> Self {
        Self {
            metric_in: RFC7181_METRIC_INFINITE,
            metric_out: RFC7181_METRIC_INFINITE,
        }
    }
}

/// One NHDP link: the local node's view of a single neighboring
/// interface heard on one of our own interfaces.
pub struct NhdpLink {
    pub remote_addr: NetAddr,
    pub status: LinkStatus,
    pub neighbor: Option<Key<Neighbor>>,

    pub sym_timer: Option<TimerHandle>,
    pub heard_timer: Option<TimerHandle>,
    pub validity_timer: Option<TimerHandle>,

    pub last_packet_seqno: Option<u16>,

    /// Flooding-MPR flags (spec.md §4.7): whether the remote has selected
    /// us, and whether we have selected the remote, as a flooding MPR.
    pub local_is_flooding_mpr: bool,
    pub neigh_is_flooding_mpr: bool,

    pub metrics: HashMap<DomainId, LinkMetric>,
    pub dat: DatMetric,
}

impl NhdpLink {
    pub fn new(remote_addr: NetAddr) -> Self {
        Self {
            remote_addr,
            status: LinkStatus::Pending,
            neighbor: None,
            sym_timer: None,
            heard_timer: None,
            validity_timer: None,
            last_packet_seqno: None,
            local_is_flooding_mpr: false,
            neigh_is_flooding_mpr: false,
            metrics: HashMap::new(),
            dat: DatMetric::new(),
        }
    }

    pub fn metric(&self, domain: DomainId) -> LinkMetric {
        self.metrics.get(&domain).copied().unwrap_or_else(LinkMetric::infinite)
    }

    pub fn set_metric(&mut self, domain: DomainId, metric: LinkMetric) {
        self.metrics.insert(domain, metric);
    }

    pub fn is_symmetric(&self) -> bool {
        self.status == LinkStatus::Symmetric
    }

    /// HELLO naming this node as a symmetric neighbor: promote to
    /// SYMMETRIC and (re-)arm the sym-timer for `sym_time_ms`.
    pub fn on_heard_as_symmetric(&mut self) {
        self.status = LinkStatus::Symmetric;
    }

    /// HELLO where the link is live but this node isn't (yet) named as
    /// symmetric: promote at least to HEARD.
    pub fn on_heard(&mut self) {
        if self.status == LinkStatus::Pending || self.status == LinkStatus::Lost {
            self.status = LinkStatus::Heard;
        }
    }

    /// sym-timer expiry: demote SYMMETRIC -> HEARD. A no-op in any other
    /// state (the timer should have been stopped already, but a stray
    /// firing must not corrupt state).
    pub fn on_sym_timeout(&mut self) {
        if self.status == LinkStatus::Symmetric {
            self.status = LinkStatus::Heard;
        }
    }

    /// heard-timer expiry: demote to LOST.
    pub fn on_heard_timeout(&mut self) {
        if self.status != LinkStatus::Lost {
            self.status = LinkStatus::Lost;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::netaddr::Mac48;

    fn link() -> NhdpLink {
        NhdpLink::new(NetAddr::Mac48(Mac48([0, 0, 0, 0, 0, 0x10])))
    }

    #[test]
    fn starts_pending() {
        assert_eq!(link().status, LinkStatus::Pending);
    }

    #[test]
    fn symmetric_hello_promotes_directly_from_pending() {
        let mut l = link();
        l.on_heard_as_symmetric();
        assert_eq!(l.status, LinkStatus::Symmetric);
    }

    #[test]
    fn sym_timeout_demotes_to_heard_not_lost() {
        let mut l = link();
        l.on_heard_as_symmetric();
        l.on_sym_timeout();
        assert_eq!(l.status, LinkStatus::Heard);
    }

    #[test]
    fn heard_timeout_demotes_to_lost() {
        let mut l = link();
        l.on_heard();
        l.on_heard_timeout();
        assert_eq!(l.status, LinkStatus::Lost);
    }

    #[test]
    fn stray_sym_timeout_in_heard_state_is_a_no_op() {
        let mut l = link();
        l.on_heard();
        l.on_sym_timeout();
        assert_eq!(l.status, LinkStatus::Heard);
    }

    #[test]
    fn lost_link_can_be_reheard() {
        let mut l = link();
        l.on_heard();
        l.on_heard_timeout();
        assert_eq!(l.status, LinkStatus::Lost);
        l.on_heard();
        assert_eq!(l.status, LinkStatus::Heard);
    }

    #[test]
    fn unknown_domain_metric_defaults_to_infinite() {
        let l = link();
        assert_eq!(l.metric(DomainId(0)).metric_in, RFC7181_METRIC_INFINITE);
    }
}
