//! `ChangeBus`: the internal observer fabric of spec.md §4.11. Subscribers
//! are registered per entity class and run synchronously, in registration
//! order, for every published event — "all observer callbacks for one event
//! fire before the next event is published to any observer" (spec.md §5).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// One bus per entity class `E` (e.g. `Bus<Layer2NetEvent>`,
/// `Bus<NhdpLinkEvent>`). `E` carries whatever payload the entity class
/// needs; `ChangeKind` is orthogonal and always present.
pub struct Bus<E> {
    subscribers: Vec<Box<dyn FnMut(ChangeKind, &E)>>,
}

impl<E> Default for Bus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E> Bus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(ChangeKind, &E) + 'static) {
        self.subscribers.push(Box::new(listener));
    }

    /// Publishes `event` to every subscriber, in registration order. All
    /// subscribers observe this one event before any subscriber observes
    /// the next `publish` call, because `publish` itself only returns once
    /// every subscriber callback has returned.
    pub fn publish(&mut self, kind: ChangeKind, event: &E) {
        for sub in self.subscribers.iter_mut() {
            sub(kind, event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E> fmt::Debug for Bus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// A debounced boolean: many producers call `mark_dirty`/`mark`, one
/// consumer drains it once. This is the "lazy, debounced recomputation"
/// pattern of spec.md §9 (domain-dirty flags feeding a single Dijkstra
/// trigger timer, MPR-dirty flags feeding a single recompute before the
/// next HELLO, ANSN bump coalescing).
#[derive(Debug, Clone, Copy, Default)]
pub struct DirtyFlag {
    dirty: bool,
}

impl DirtyFlag {
    pub fn mark(&mut self) -> bool {
        let was_clean = !self.dirty;
        self.dirty = true;
        was_clean
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the flag and reports whether it had been set, so the caller
    /// can decide whether to do the expensive recomputation at all.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ev(u32);

    #[test]
    fn subscribers_fire_in_registration_order() {
        let mut bus: Bus<Ev> = Bus::new();
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let log1 = log.clone();
        bus.subscribe(move |_, ev: &Ev| log1.borrow_mut().push(("a", ev.0)));
        let log2 = log.clone();
        bus.subscribe(move |_, ev: &Ev| log2.borrow_mut().push(("b", ev.0)));

        bus.publish(ChangeKind::Changed, &Ev(7));
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dirty_flag_coalesces_repeated_marks() {
        let mut flag = DirtyFlag::default();
        assert!(flag.mark());
        assert!(!flag.mark());
        assert!(flag.take());
        assert!(!flag.is_dirty());
        assert!(!flag.take());
    }
}
