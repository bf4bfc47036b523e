//! 16-bit serial-number arithmetic (RFC 1982), used for ANSN comparisons
//! (spec.md §4.8, testable property 7) and RFC5444 packet/message sequence
//! numbers (spec.md §4.3, testable property 6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialU16(pub u16);

impl SerialU16 {
    pub fn new(v: u16) -> Self {
        Self(v)
    }

    /// `(self - other) mod 2^16`, the raw wrapping distance used by the
    /// serial-number comparison rule.
    pub fn wrapping_diff(self, other: SerialU16) -> u16 {
        self.0.wrapping_sub(other.0)
    }

    /// `self < other` under serial arithmetic: `(self - other) mod 2^16 >
    /// 2^15`.
    pub fn is_before(self, other: SerialU16) -> bool {
        self.wrapping_diff(other) > 0x8000
    }

    pub fn is_after(self, other: SerialU16) -> bool {
        other.is_before(self)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl From<u16> for SerialU16 {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for SerialU16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_ordering_holds_away_from_the_wrap_point() {
        assert!(SerialU16::new(5).is_before(SerialU16::new(10)));
        assert!(!SerialU16::new(10).is_before(SerialU16::new(5)));
    }

    #[test]
    fn wraps_around_correctly() {
        // 65535 was "before" 1 (the counter wrapped).
        assert!(SerialU16::new(65535).is_before(SerialU16::new(1)));
        assert!(!SerialU16::new(1).is_before(SerialU16::new(65535)));
    }

    #[test]
    fn sequence_number_always_advances_by_a_positive_wrapping_delta() {
        let prev = SerialU16::new(65534);
        let cur = prev.next().next();
        assert_eq!(cur.wrapping_diff(prev), 2);
        assert!(cur.wrapping_diff(prev) > 0);
    }
}
