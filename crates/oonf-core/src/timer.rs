//! `TimerWheel`: the hierarchical timer set described in spec.md §4.1.
//!
//! This is deliberately synchronous and clock-agnostic (callers feed it a
//! monotonic millisecond timestamp) so it can be unit tested without an
//! async runtime. The actual cooperative event loop that drives it from a
//! real clock and multiplexes it with socket readiness lives in
//! `oonf-socket::scheduler`, next to `SocketSet` (see DESIGN.md for why the
//! two halves of spec.md's "TimerWheel & Scheduler" component live in
//! different crates).

use std::collections::BTreeMap;

use crate::arena::{Arena, Key};

struct TimerSlot {
    due_ms: u64,
    period_ms: Option<u64>,
    armed: bool,
    /// Mirrors this timer's current key in `TimerWheel::order`, so `set`/
    /// `stop` can remove the old entry without a linear scan.
    order_key: Option<(u64, u64)>,
}

pub type TimerHandle = Key<TimerSlot>;

/// Fired timers are returned in a stable (but otherwise unspecified, per
/// spec.md §4.1) order for a single `advance_to` call: insertion-sequence
/// order of their most recent (re-)arm.
pub struct TimerWheel {
    slots: Arena<TimerSlot>,
    /// (due_ms, arm_seq) -> handle; arm_seq breaks ties deterministically
    /// and is bumped on every `set`, so a timer re-armed mid-tick sorts
    /// after timers armed earlier even if the due time is identical.
    order: BTreeMap<(u64, u64), TimerHandle>,
    arm_seq: u64,
    now_ms: u64,
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TimerWheel {
    pub fn new(now_ms: u64) -> Self {
        Self {
            slots: Arena::new(),
            order: BTreeMap::new(),
            arm_seq: 0,
            now_ms,
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Allocates an unarmed timer handle.
    pub fn create(&mut self) -> TimerHandle {
        self.slots.insert(TimerSlot {
            due_ms: 0,
            period_ms: None,
            armed: false,
            order_key: None,
        })
    }

    /// Frees the handle entirely (the handle becomes permanently invalid,
    /// unlike `stop` which just disarms it).
    pub fn destroy(&mut self, handle: TimerHandle) {
        self.stop(handle);
        self.slots.remove(handle);
    }

    /// (Re-)arms `handle` to fire `due_in_ms` from now. Idempotent: calling
    /// `set` on an already-armed timer simply replaces its due time.
    pub fn set(&mut self, handle: TimerHandle, due_in_ms: u64, periodic: Option<u64>) {
        let due_ms = self.now_ms + due_in_ms;
        let seq = self.next_seq();
        let Some(slot) = self.slots.get_mut(handle) else {
            return;
        };
        if let Some(old_key) = slot.order_key.take() {
            self.order.remove(&old_key);
        }
        slot.due_ms = due_ms;
        slot.period_ms = periodic;
        slot.armed = true;
        slot.order_key = Some((due_ms, seq));
        self.order.insert((due_ms, seq), handle);
    }

    fn next_seq(&mut self) -> u64 {
        self.arm_seq += 1;
        self.arm_seq
    }

    pub fn stop(&mut self, handle: TimerHandle) {
        let Some(slot) = self.slots.get_mut(handle) else {
            return;
        };
        slot.armed = false;
        if let Some(old_key) = slot.order_key.take() {
            self.order.remove(&old_key);
        }
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.slots.get(handle).map(|s| s.armed).unwrap_or(false)
    }

    /// Milliseconds until firing, or `0` if past-due. `None` if the handle
    /// is unarmed or invalid.
    pub fn get_due(&self, handle: TimerHandle) -> Option<u64> {
        let slot = self.slots.get(handle)?;
        if !slot.armed {
            return None;
        }
        Some(slot.due_ms.saturating_sub(self.now_ms))
    }

    /// Absolute time of the earliest armed timer, for a caller deciding how
    /// long to sleep.
    pub fn next_due_at(&self) -> Option<u64> {
        self.order.keys().next().map(|(due, _)| *due)
    }

    /// Advances the wheel's clock to `now_ms` and drains every timer due at
    /// or before it. Periodic timers are re-armed for `period_ms` past their
    /// previous due time (not past `now_ms`, so a long stall does not
    /// stretch the period) before being returned, so a callback observing
    /// `is_active` on its own handle during firing sees it already
    /// re-armed, matching spec.md §5's "re-arms for t=0 runs in the same
    /// iteration only if not yet drained" ordering rule.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<TimerHandle> {
        self.now_ms = now_ms;
        let mut fired = Vec::new();

        loop {
            let Some((&(due, seq), &handle)) = self.order.iter().next() else {
                break;
            };
            if due > now_ms {
                break;
            }
            self.order.remove(&(due, seq));

            if let Some(slot) = self.slots.get_mut(handle) {
                match slot.period_ms {
                    Some(period) => {
                        let mut next_due = due + period.max(1);
                        if next_due <= now_ms {
                            // Stalled past multiple periods: resync instead
                            // of firing a storm of already-due periods.
                            next_due = now_ms + period.max(1);
                        }
                        slot.due_ms = next_due;
                        let next_seq = self.arm_seq + 1;
                        self.arm_seq = next_seq;
                        slot.order_key = Some((next_due, next_seq));
                        self.order.insert((next_due, next_seq), handle);
                    }
                    None => {
                        slot.armed = false;
                        slot.order_key = None;
                    }
                }
            }
            fired.push(handle);
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once() {
        let mut wheel = TimerWheel::new(0);
        let t = wheel.create();
        wheel.set(t, 100, None);

        assert!(wheel.advance_to(50).is_empty());
        assert_eq!(wheel.advance_to(100), vec![t]);
        assert!(!wheel.is_active(t));
        assert!(wheel.advance_to(200).is_empty());
    }

    #[test]
    fn periodic_rearms_itself() {
        let mut wheel = TimerWheel::new(0);
        let t = wheel.create();
        wheel.set(t, 100, Some(100));

        assert_eq!(wheel.advance_to(100), vec![t]);
        assert!(wheel.is_active(t));
        assert_eq!(wheel.get_due(t), Some(100));
        assert_eq!(wheel.advance_to(200), vec![t]);
    }

    #[test]
    fn re_arm_is_idempotent_replace() {
        let mut wheel = TimerWheel::new(0);
        let t = wheel.create();
        wheel.set(t, 100, None);
        wheel.set(t, 50, None);
        assert_eq!(wheel.get_due(t), Some(50));
        assert_eq!(wheel.advance_to(50), vec![t]);
    }

    #[test]
    fn stop_is_safe_when_not_armed() {
        let mut wheel = TimerWheel::new(0);
        let t = wheel.create();
        wheel.stop(t);
        assert!(!wheel.is_active(t));
    }

    #[test]
    fn destroyed_handle_is_absent() {
        let mut wheel = TimerWheel::new(0);
        let t = wheel.create();
        wheel.set(t, 10, None);
        wheel.destroy(t);
        assert_eq!(wheel.get_due(t), None);
        assert!(wheel.advance_to(100).is_empty());
    }
}
