//! Two-hop neighbor entries (spec.md §3's TwoHopEntry): addresses heard as
//! symmetric from one of our links' far end, kept alive by a
//! validity-timer and refreshed on every HELLO that mentions them.

use std::collections::HashMap;

use oonf_core::arena::Key;
use oonf_core::netaddr::NetAddr;
use oonf_core::timer::TimerHandle;

use crate::domain::DomainId;
use crate::link::NhdpLink;

#[derive(Debug, Clone, Copy)]
pub struct TwoHopMetric {
    pub metric_in: u32,
    pub metric_out: u32,
}

impl Default for TwoHopMetric {
    fn default() -> Self {
        Self {
            metric_in: oonf_rfc5444::RFC7181_METRIC_INFINITE,
            metric_out: oonf_rfc5444::RFC7181_METRIC_INFINITE,
        }
    }
}

/// An address reachable in two hops via a particular [`NhdpLink`].
pub struct TwoHopEntry {
    pub far_addr: NetAddr,
    pub via_link: Key<NhdpLink>,
    pub validity_timer: Option<TimerHandle>,
    /// True when `far_addr` is also reachable on the same interface as
    /// `via_link` directly (used by MPR selection's "no self-coverage").
    pub same_interface: bool,
    pub metrics: HashMap<DomainId, TwoHopMetric>,
}

impl TwoHopEntry {
    pub fn new(far_addr: NetAddr, via_link: Key<NhdpLink>) -> Self {
        Self {
            far_addr,
            via_link,
            validity_timer: None,
            same_interface: false,
            metrics: HashMap::new(),
        }
    }

    pub fn metric(&self, domain: DomainId) -> TwoHopMetric {
        self.metrics.get(&domain).copied().unwrap_or_default()
    }

    pub fn set_metric(&mut self, domain: DomainId, metric: TwoHopMetric) {
        self.metrics.insert(domain, metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::arena::Arena;

    #[test]
    fn new_entry_defaults_to_infinite_metric() {
        let mut arena: Arena<NhdpLink> = Arena::new();
        let key = arena.insert(NhdpLink::new(NetAddr::Mac48(oonf_core::netaddr::Mac48([0, 0, 0, 0, 0, 1]))));
        let entry = TwoHopEntry::new(NetAddr::Mac48(oonf_core::netaddr::Mac48([0, 0, 0, 0, 0, 2])), key);
        assert_eq!(entry.metric(DomainId(0)).metric_in, oonf_rfc5444::RFC7181_METRIC_INFINITE);
    }
}
