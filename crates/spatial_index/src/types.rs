//! # Core Type Definitions
//!
//! - [`AxisRange`] - inclusive bounds of a query box along one axis
//! - [`IndexEntry`] - an entity id together with its stored coordinates

use serde::{Deserialize, Serialize};

/// Inclusive `[lo, hi]` bounds along a single axis.
///
/// Bounds coming from callers may be given in either order; the index
/// normalizes them before decomposing a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisRange {
    pub lo: u64,
    pub hi: u64,
}

impl AxisRange {
    pub fn new(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }

    /// Returns the range with `lo <= hi`
    pub fn normalized(self) -> Self {
        if self.lo <= self.hi {
            self
        } else {
            Self {
                lo: self.hi,
                hi: self.lo,
            }
        }
    }

    /// Whether `value` lies within the bounds, inclusive on both ends
    pub fn contains(&self, value: u64) -> bool {
        value >= self.lo && value <= self.hi
    }

    /// Number of integer positions covered (`hi - lo + 1`)
    pub fn span(&self) -> u128 {
        u128::from(self.hi) - u128::from(self.lo) + 1
    }
}

impl From<(u64, u64)> for AxisRange {
    fn from((lo, hi): (u64, u64)) -> Self {
        Self::new(lo, hi)
    }
}

impl From<[u64; 2]> for AxisRange {
    fn from([lo, hi]: [u64; 2]) -> Self {
        Self::new(lo, hi)
    }
}

/// An indexed entity as returned by queries and lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Entity identifier
    pub id: String,
    /// Stored coordinates, one per axis
    pub coordinates: Vec<u64>,
}

impl IndexEntry {
    pub fn new(id: impl Into<String>, coordinates: Vec<u64>) -> Self {
        Self {
            id: id.into(),
            coordinates,
        }
    }

    /// Whether every coordinate lies within the matching axis range
    pub fn within(&self, range: &[AxisRange]) -> bool {
        self.coordinates.len() == range.len()
            && self
                .coordinates
                .iter()
                .zip(range)
                .all(|(value, axis)| axis.contains(*value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized() {
        assert_eq!(AxisRange::new(9, 2).normalized(), AxisRange::new(2, 9));
        assert_eq!(AxisRange::new(2, 9).normalized(), AxisRange::new(2, 9));
        assert_eq!(AxisRange::from((4, 4)).normalized().span(), 1);
    }

    #[test]
    fn test_full_span_does_not_overflow() {
        assert_eq!(AxisRange::new(0, u64::MAX).span(), 1u128 << 64);
    }

    #[test]
    fn test_entry_within() {
        let entry = IndexEntry::new("a", vec![3, 5]);
        let inside = [AxisRange::new(0, 8), AxisRange::new(5, 5)];
        let outside = [AxisRange::new(0, 8), AxisRange::new(6, 9)];
        assert!(entry.within(&inside));
        assert!(!entry.within(&outside));
        assert!(!entry.within(&inside[..1]));
    }

    #[test]
    fn test_entry_serialization() {
        let entry = IndexEntry::new("ship-7", vec![10, 20]);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"id":"ship-7","coordinates":[10,20]}"#);
    }
}
