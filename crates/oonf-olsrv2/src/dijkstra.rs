//! Per-domain Dijkstra (spec.md §4.9): a textbook priority-queue shortest
//! path over the TC graph, seeded from NHDP's symmetric neighbors,
//! tie-broken by (cost, hops, target originator) — see DESIGN.md's Open
//! Question resolution for why a `BTreeMap` frontier was chosen over a
//! binary heap.

use std::collections::{BTreeMap, HashMap, HashSet};

use oonf_core::arena::Key;
use oonf_core::netaddr::{AddressFamily, NetAddr, RouteKey};
use oonf_rfc5444::RFC7181_METRIC_MAX;

use crate::lan::LocalLan;
use crate::tc::{TcDb, TcNode};

#[derive(Debug, Clone, Copy)]
pub struct RoutingEntry {
    pub route: RouteKey,
    pub path_cost: u32,
    pub path_hops: u32,
    pub next_originator: NetAddr,
    pub last_originator: NetAddr,
    /// Hop-distance to the announcing gateway (spec.md §3's TcAttachment/
    /// LAN "distance" field); 0 for a route to a plain TcNode.
    pub distance: u8,
}

#[derive(Debug, Clone, Copy)]
struct Seed {
    target: Key<TcNode>,
    path_cost: u32,
    path_hops: u32,
    first_hop: NetAddr,
}

/// One candidate entry in the frontier, ordered first by cost then hops
/// then target originator (spec.md §4.9's explicit tie-break) so a
/// `BTreeMap<Candidate, Key<TcNode>>` pops the right entry via
/// `first_key_value` without a separate heap type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    cost: u32,
    hops: u32,
    target_originator_bits: (u8, [u8; 8]),
}

fn sortable_originator(addr: &NetAddr) -> (u8, [u8; 8]) {
    let mut bytes = [0u8; 8];
    match addr {
        NetAddr::V4(n) => {
            bytes[..4].copy_from_slice(&n.ip().octets());
            (0, bytes)
        }
        NetAddr::V6(n) => {
            bytes.copy_from_slice(&n.ip().octets()[..8]);
            (1, bytes)
        }
        NetAddr::Mac48(m) => {
            bytes[..6].copy_from_slice(&m.0);
            (2, bytes)
        }
        NetAddr::Eui64(e) => {
            bytes.copy_from_slice(&e.0);
            (3, bytes)
        }
    }
}

struct Reached {
    path_cost: u32,
    path_hops: u32,
    first_hop: NetAddr,
    last_originator: NetAddr,
}

/// Runs one Dijkstra pass over `tc`, seeded from `seeds` (spec.md §4.9's
/// "single-hop routes to neighbor addresses are also produced directly
/// from NHDPLinkSet"). `family` selects which address family of
/// `TcAttachment`/`TcNode` counts (callers filter before building seeds).
/// `expand_into` gates which nodes a pass may step into (the `ss_split`
/// two-pass restriction of spec.md §4.9: pass one may only reach
/// non-source-specific nodes).
fn run_pass(
    tc: &TcDb,
    seeds: &[Seed],
    already_done: &HashSet<Key<TcNode>>,
    expand_into: &impl Fn(&TcNode) -> bool,
    edge_metric: &impl Fn(&crate::tc::TcEdge) -> u32,
) -> HashMap<Key<TcNode>, Reached> {
    let mut done: HashSet<Key<TcNode>> = already_done.clone();
    let mut best: HashMap<Key<TcNode>, Reached> = HashMap::new();
    let mut frontier: BTreeMap<Candidate, Key<TcNode>> = BTreeMap::new();

    for seed in seeds {
        let Some(node) = tc.nodes.get(seed.target) else { continue };
        if !expand_into(node) {
            continue;
        }
        let candidate = Candidate {
            cost: seed.path_cost,
            hops: seed.path_hops,
            target_originator_bits: sortable_originator(&node.originator),
        };
        if best.get(&seed.target).map(|r| r.path_cost).unwrap_or(u32::MAX) > seed.path_cost {
            best.insert(
                seed.target,
                Reached {
                    path_cost: seed.path_cost,
                    path_hops: seed.path_hops,
                    first_hop: seed.first_hop,
                    last_originator: node.originator,
                },
            );
            frontier.insert(candidate, seed.target);
        }
    }

    while let Some((candidate, &target)) = frontier.iter().next().map(|(c, t)| (*c, t)) {
        frontier.remove(&candidate);
        if done.contains(&target) {
            continue;
        }
        done.insert(target);

        let Some(node) = tc.nodes.get(target) else { continue };
        let Some(reached) = best.get(&target).map(|r| (r.path_cost, r.path_hops, r.first_hop)) else { continue };
        let (cur_cost, cur_hops, first_hop) = reached;

        for &edge_key in node.edges_out() {
            let Some(edge) = tc.edges.get(edge_key) else { continue };
            if done.contains(&edge.to) {
                continue;
            }
            let Some(to_node) = tc.nodes.get(edge.to) else { continue };
            if !expand_into(to_node) {
                continue;
            }
            let weight = edge_metric(edge);
            if weight > RFC7181_METRIC_MAX {
                continue;
            }
            let new_cost = cur_cost.saturating_add(weight);
            let new_hops = cur_hops + 1;
            let improves = best
                .get(&edge.to)
                .map(|r| (new_cost, new_hops) < (r.path_cost, r.path_hops))
                .unwrap_or(true);
            if improves {
                best.insert(
                    edge.to,
                    Reached {
                        path_cost: new_cost,
                        path_hops: new_hops,
                        first_hop,
                        last_originator: node.originator,
                    },
                );
                frontier.insert(
                    Candidate {
                        cost: new_cost,
                        hops: new_hops,
                        target_originator_bits: sortable_originator(&to_node.originator),
                    },
                    edge.to,
                );
            }
        }
    }

    best
}

fn allow_all(_: &TcNode) -> bool {
    true
}

fn non_source_specific(node: &TcNode) -> bool {
    !node.source_specific
}

/// spec.md §4.9: "`ss_split` = (exists source-specific TcNode) AND (not
/// all nodes are source-specific) AND (exists source-specific attachment
/// in this domain)".
fn ss_split_required(tc: &TcDb, family: AddressFamily) -> bool {
    let mut has_ss_node = false;
    let mut has_non_ss_node = false;
    let mut has_ss_attachment = false;
    for (_, node) in tc.nodes.iter() {
        if node.originator.family() != family {
            continue;
        }
        if node.source_specific {
            has_ss_node = true;
        } else {
            has_non_ss_node = true;
        }
        if node.attachments.iter().any(|a| a.src.is_some()) {
            has_ss_attachment = true;
        }
    }
    has_ss_node && has_non_ss_node && has_ss_attachment
}

/// Runs Dijkstra for one `(domain, family)` pair (spec.md §4.9): one
/// [`RoutingEntry`] per reached `TcNode` originator, per reachable
/// `TcAttachment` (keyed by the attachment's own dst/src prefix, cost
/// extended by its announced metric), and per active [`LocalLan`] not
/// already beaten by a cheaper remote route.
pub fn run(
    tc: &TcDb,
    family: AddressFamily,
    seeds: &[(Key<TcNode>, u32, NetAddr)],
    local_originator: NetAddr,
    local_lans: &[LocalLan],
    edge_metric: impl Fn(&crate::tc::TcEdge) -> u32,
) -> Vec<RoutingEntry> {
    let seed_list: Vec<Seed> = seeds
        .iter()
        .filter(|(key, _, _)| tc.nodes.get(*key).map(|n| n.originator.family() == family).unwrap_or(false))
        .map(|&(target, path_cost, first_hop)| Seed { target, path_cost, path_hops: 1, first_hop })
        .collect();

    let ss_split = ss_split_required(tc, family);
    let first_pass_gate: &dyn Fn(&TcNode) -> bool = if ss_split { &non_source_specific } else { &allow_all };

    let mut reached = run_pass(tc, &seed_list, &HashSet::new(), &first_pass_gate, &edge_metric);

    if ss_split {
        let second_pass_seeds: Vec<Seed> = reached
            .iter()
            .map(|(&target, r)| Seed {
                target,
                path_cost: r.path_cost,
                path_hops: r.path_hops,
                first_hop: r.first_hop,
            })
            .collect();
        let second_pass = run_pass(tc, &second_pass_seeds, &HashSet::new(), &allow_all, &edge_metric);
        for (key, r) in second_pass {
            reached.entry(key).or_insert(r);
        }
    }

    let mut by_route: HashMap<RouteKey, RoutingEntry> = HashMap::new();
    let mut insert_if_better = |entry: RoutingEntry| {
        if !entry.route.dst.is_routable() || entry.route.dst.family() != family {
            return;
        }
        let replace = by_route.get(&entry.route).map(|cur| entry.path_cost < cur.path_cost).unwrap_or(true);
        if replace {
            by_route.insert(entry.route, entry);
        }
    };

    for (&target_key, r) in reached.iter() {
        let Some(node) = tc.nodes.get(target_key) else { continue };
        if node.originator.family() != family {
            continue;
        }
        insert_if_better(RoutingEntry {
            route: RouteKey::new(node.originator),
            path_cost: r.path_cost,
            path_hops: r.path_hops,
            next_originator: r.first_hop,
            last_originator: r.last_originator,
            distance: 0,
        });

        for attachment in &node.attachments {
            if attachment.prefix.family() != family {
                continue;
            }
            let route = match attachment.src {
                Some(src) => RouteKey::with_source(attachment.prefix, src),
                None => RouteKey::new(attachment.prefix),
            };
            insert_if_better(RoutingEntry {
                route,
                path_cost: r.path_cost.saturating_add(attachment.metric),
                path_hops: r.path_hops + 1,
                next_originator: r.first_hop,
                last_originator: r.last_originator,
                distance: attachment.distance,
            });
        }
    }

    for lan in local_lans {
        if !lan.active || lan.route.family() != family {
            continue;
        }
        let candidate = RoutingEntry {
            route: lan.route,
            path_cost: lan.outgoing_metric,
            path_hops: 1,
            next_originator: local_originator,
            last_originator: local_originator,
            distance: lan.distance,
        };
        // Suppressed only when a remote route already beats it outright
        // (spec.md §4.9: "local-LAN destinations already reachable with
        // a better LAN-metric are suppressed").
        let suppressed = by_route.get(&lan.route).map(|cur| cur.path_cost < candidate.path_cost).unwrap_or(false);
        if !suppressed {
            by_route.insert(lan.route, candidate);
        }
    }

    by_route.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tc::TcNeighborAdvert;
    use oonf_core::serial::SerialU16;
    use std::net::Ipv4Addr;

    fn addr(last: u8) -> NetAddr {
        NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn prefers_lower_cost_path() {
        let mut tc = TcDb::new();
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);
        // a -> b (cost 5), a -> c (cost 1), c -> b (cost 1): best path to b is via c, cost 2.
        tc.process_tc(
            a,
            SerialU16::new(1),
            &[
                TcNeighborAdvert { originator: b, metric_in: 5, metric_out: 5 },
                TcNeighborAdvert { originator: c, metric_in: 1, metric_out: 1 },
            ],
            vec![],
        );
        tc.process_tc(c, SerialU16::new(1), &[TcNeighborAdvert { originator: b, metric_in: 1, metric_out: 1 }], vec![]);

        // Seed directly from a's own TC-advertised edges, standing in for
        // NHDP's symmetric-neighbor seeding (spec.md §4.9).
        let b_key = tc.node_for(&b).unwrap();
        let c_key = tc.node_for(&c).unwrap();
        let entries = run(&tc, AddressFamily::Ipv4, &[(b_key, 5, b), (c_key, 1, c)], a, &[], |e| e.metric_out);

        let to_b = entries.iter().find(|e| e.route.dst == b).unwrap();
        assert_eq!(to_b.path_cost, 2);
        assert_eq!(to_b.path_hops, 2);
    }

    #[test]
    fn unreachable_targets_are_absent() {
        let mut tc = TcDb::new();
        let a = addr(1);
        let isolated = addr(9);
        tc.process_tc(a, SerialU16::new(1), &[], vec![]);
        tc.process_tc(isolated, SerialU16::new(1), &[], vec![]);

        let a_key = tc.node_for(&a).unwrap();
        let entries = run(&tc, AddressFamily::Ipv4, &[(a_key, 0, a)], a, &[], |e| e.metric_out);
        assert!(!entries.iter().any(|e| e.route.dst == isolated));
    }

    fn prefix(base: u8, len: u8) -> NetAddr {
        NetAddr::V4(ipnetwork::Ipv4Network::new(Ipv4Addr::new(10, base, 0, 0), len).unwrap())
    }

    #[test]
    fn attachment_route_is_emitted_with_node_cost_plus_attachment_metric() {
        let mut tc = TcDb::new();
        let a = addr(1);
        let d = addr(4);
        let gateway_prefix = prefix(1, 16);
        tc.process_tc(
            a,
            SerialU16::new(1),
            &[TcNeighborAdvert { originator: d, metric_in: 3, metric_out: 3 }],
            vec![],
        );
        tc.process_tc(
            d,
            SerialU16::new(1),
            &[],
            vec![crate::tc::TcAttachment {
                prefix: gateway_prefix,
                src: None,
                distance: 2,
                metric: 7,
                ansn: SerialU16::new(1),
            }],
        );

        let d_key = tc.node_for(&d).unwrap();
        let entries = run(&tc, AddressFamily::Ipv4, &[(d_key, 3, d)], a, &[], |e| e.metric_out);

        let to_prefix = entries.iter().find(|e| e.route.dst == gateway_prefix).unwrap();
        assert_eq!(to_prefix.path_cost, 10);
        assert_eq!(to_prefix.distance, 2);
    }

    #[test]
    fn local_lan_suppressed_only_when_strictly_beaten() {
        let tc = TcDb::new();
        let origin = addr(1);
        let lan_prefix = prefix(9, 24);
        let lans = vec![crate::lan::LocalLan::new(RouteKey::new(lan_prefix), 4, 1)];

        let entries = run(&tc, AddressFamily::Ipv4, &[], origin, &lans, |e| e.metric_out);
        let to_lan = entries.iter().find(|e| e.route.dst == lan_prefix).unwrap();
        assert_eq!(to_lan.path_cost, 4);
        assert_eq!(to_lan.distance, 1);
    }

    #[test]
    fn ss_split_runs_second_pass_seeded_from_first() {
        let mut tc = TcDb::new();
        let a = addr(1);
        let b = addr(2);
        let ss_node = addr(5);

        tc.process_tc(a, SerialU16::new(1), &[TcNeighborAdvert { originator: b, metric_in: 2, metric_out: 2 }], vec![]);
        tc.process_tc(
            b,
            SerialU16::new(1),
            &[TcNeighborAdvert { originator: ss_node, metric_in: 1, metric_out: 1 }],
            vec![],
        );
        let ss_key = tc.node_for(&ss_node).unwrap();
        tc.nodes.get_mut(ss_key).unwrap().source_specific = true;
        tc.nodes.get_mut(ss_key).unwrap().attachments.push(crate::tc::TcAttachment {
            prefix: prefix(7, 24),
            src: Some(prefix(1, 24)),
            distance: 0,
            metric: 1,
            ansn: SerialU16::new(1),
        });

        let b_key = tc.node_for(&b).unwrap();
        let entries = run(&tc, AddressFamily::Ipv4, &[(b_key, 2, b)], a, &[], |e| e.metric_out);

        let to_ss = entries.iter().find(|e| e.route.dst == ss_node).unwrap();
        assert_eq!(to_ss.path_cost, 3);
    }
}
