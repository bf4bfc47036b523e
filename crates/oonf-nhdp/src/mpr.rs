//! MPR selection (spec.md §4.7): a pluggable algorithm per domain,
//! recomputed on demand via a dirty flag, never more than once between
//! HELLO emissions. Grounded on
//! `examples/original_source/src/nhdp/nhdp/nhdp_domain.c`'s
//! `mpr_handler`/`nhdp_domain_mpr_set` split, simplified to the
//! "everyone" default this daemon ships (see DESIGN.md's Open Question
//! resolution for why a smarter flooding-MPR heuristic is left as a
//! second implementation of the same trait rather than built in).

use std::collections::HashMap;

use oonf_core::arena::Key;

use crate::constants::WILLINGNESS_NEVER;
use crate::neighbor::Neighbor;

/// A read-only view of the candidates an [`MprAlgorithm`] chooses among:
/// each neighbor's arena key plus its willingness for the domain being
/// computed.
pub struct MprCandidates<'a> {
    pub willingness: &'a HashMap<Key<Neighbor>, u8>,
}

pub trait MprAlgorithm {
    /// Returns the set of neighbor keys selected as MPR for this domain.
    fn select(&self, candidates: &MprCandidates<'_>) -> Vec<Key<Neighbor>>;
}

/// spec.md §4.7's default: every neighbor with willingness > NEVER.
#[derive(Debug, Default, Clone, Copy)]
pub struct EveryoneMpr;

impl MprAlgorithm for EveryoneMpr {
    fn select(&self, candidates: &MprCandidates<'_>) -> Vec<Key<Neighbor>> {
        candidates
            .willingness
            .iter()
            .filter(|(_, &w)| w > WILLINGNESS_NEVER)
            .map(|(&k, _)| k)
            .collect()
    }
}

/// Tracks whether a domain's MPR sets need recomputing; set by any
/// mutation that could invalidate them, cleared once `select` has run.
#[derive(Debug, Default)]
pub struct MprDirtyFlag {
    dirty: bool,
}

impl MprDirtyFlag {
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Runs `recompute` only if dirty, then clears the flag. Returns
    /// `true` if a recomputation actually ran.
    pub fn recompute_if_dirty(&mut self, mut recompute: impl FnMut()) -> bool {
        if !self.dirty {
            return false;
        }
        recompute();
        self.dirty = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::arena::Arena;

    #[test]
    fn everyone_excludes_willingness_never() {
        let mut arena: Arena<Neighbor> = Arena::new();
        let willing = arena.insert(Neighbor::new());
        let never = arena.insert(Neighbor::new());

        let mut willingness = HashMap::new();
        willingness.insert(willing, 7);
        willingness.insert(never, WILLINGNESS_NEVER);

        let selected = EveryoneMpr.select(&MprCandidates { willingness: &willingness });
        assert!(selected.contains(&willing));
        assert!(!selected.contains(&never));
    }

    #[test]
    fn dirty_flag_runs_recompute_exactly_once_until_remarked() {
        let mut flag = MprDirtyFlag::default();
        flag.mark_dirty();
        let mut runs = 0;
        assert!(flag.recompute_if_dirty(|| runs += 1));
        assert!(!flag.recompute_if_dirty(|| runs += 1));
        assert_eq!(runs, 1);

        flag.mark_dirty();
        assert!(flag.recompute_if_dirty(|| runs += 1));
        assert_eq!(runs, 2);
    }
}
