use oonf_core::netaddr::NetAddr;

use crate::origin::OriginHandle;

/// The value held by a [`DataSlot`], tagged by semantic type. A slot's type
/// is fixed for its lifetime — no origin may reinterpret an
/// integer-fixed-point slot as a boolean, for example; [`DataSlot::set`]
/// rejects a value of the wrong shape once one has been set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataValue {
    /// A fixed-point integer: the reported value is `raw` expressed in
    /// `1/scale`th units, e.g. a loss rate scaled by 1000.
    FixedPoint { raw: i64, scale: i64 },
    Boolean(bool),
    Addr(NetAddr),
}

impl DataValue {
    pub fn fixed_point(raw: i64, scale: i64) -> Self {
        Self::FixedPoint { raw, scale }
    }

    fn same_shape(&self, other: &DataValue) -> bool {
        matches!(
            (self, other),
            (DataValue::FixedPoint { .. }, DataValue::FixedPoint { .. })
                | (DataValue::Boolean(_), DataValue::Boolean(_))
                | (DataValue::Addr(_), DataValue::Addr(_))
        )
    }
}

/// One typed slot on a [`super::net::Layer2Net`] or
/// [`super::neigh::Layer2Neigh`]: a value plus the origin that last wrote
/// it. Empty slots have no origin.
#[derive(Debug, Clone, Default)]
pub struct DataSlot {
    value: Option<DataValue>,
    origin: Option<OriginHandle>,
}

impl DataSlot {
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn value(&self) -> Option<DataValue> {
        self.value
    }

    pub fn origin(&self) -> Option<&OriginHandle> {
        self.origin.as_ref()
    }

    /// Accepted iff the slot is empty, the writer already owns it, or the
    /// new origin's priority is greater-or-equal to the current owner's
    /// (spec.md §4.4 and testable property 5). Returns whether the stored
    /// value actually changed.
    pub fn set(&mut self, origin: &OriginHandle, value: DataValue) -> bool {
        let admitted = match &self.origin {
            None => true,
            Some(cur) => cur.same_origin(origin) || origin.priority() >= cur.priority(),
        };
        if !admitted {
            return false;
        }
        if let Some(existing) = &self.value {
            debug_assert!(
                existing.same_shape(&value),
                "slot type changed across origins: {existing:?} -> {value:?}"
            );
        }
        let changed = self.value != Some(value) || self.origin.as_ref() != Some(origin);
        self.value = Some(value);
        self.origin = Some(origin.clone());
        changed
    }

    pub fn reset(&mut self) {
        self.value = None;
        self.origin = None;
    }

    pub fn get_int64(&self, default_scale: i64, default: i64) -> i64 {
        match self.value {
            Some(DataValue::FixedPoint { raw, scale }) if scale != 0 => {
                raw * default_scale / scale
            }
            Some(DataValue::FixedPoint { raw, .. }) => raw,
            _ => default,
        }
    }

    pub fn get_bool(&self, default: bool) -> bool {
        match self.value {
            Some(DataValue::Boolean(b)) => b,
            _ => default,
        }
    }

    pub fn get_addr(&self) -> Option<NetAddr> {
        match self.value {
            Some(DataValue::Addr(a)) => Some(a),
            _ => None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_or_equal_priority_overwrites() {
        let low = OriginHandle::new("driver", 0, true);
        let high = OriginHandle::new("config", 10, false);

        let mut slot = DataSlot::default();
        assert!(slot.set(&low, DataValue::fixed_point(100, 1000)));
        assert!(slot.set(&high, DataValue::fixed_point(200, 1000)));
        assert_eq!(slot.get_int64(1000, 0), 200);
    }

    #[test]
    fn lower_priority_is_rejected_and_slot_unchanged() {
        let low = OriginHandle::new("driver", 0, true);
        let high = OriginHandle::new("config", 10, false);

        let mut slot = DataSlot::default();
        assert!(slot.set(&high, DataValue::fixed_point(200, 1000)));
        assert!(!slot.set(&low, DataValue::fixed_point(999, 1000)));
        assert_eq!(slot.get_int64(1000, 0), 200);
    }

    #[test]
    fn same_origin_may_always_rewrite() {
        let origin = OriginHandle::new("driver", 5, true);
        let mut slot = DataSlot::default();
        assert!(slot.set(&origin, DataValue::fixed_point(1, 1)));
        assert!(slot.set(&origin, DataValue::fixed_point(2, 1)));
        assert_eq!(slot.get_int64(1, 0), 2);
    }
}
