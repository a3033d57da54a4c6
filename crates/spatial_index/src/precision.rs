//! Cell exponent selection.
//!
//! Small cells mean many scans with few false positives; large cells mean
//! few scans that return more members to filter out. The selector starts
//! from a cell comparable to the narrowest side of the box and grows it
//! until the box touches fewer than [`FAN_OUT_BUDGET`] cells.

use crate::decompose::cell_count;
use crate::types::AxisRange;

/// Upper bound (exclusive) on the number of range scans per query
pub const FAN_OUT_BUDGET: u128 = 20;

/// Initial exponent: roughly log2 of the narrowest side of the box
fn seed_exponent(range: &[AxisRange]) -> u32 {
    let mut delta = range.iter().map(AxisRange::span).min().unwrap_or(1);
    let mut exp = 1;
    while delta > 2 {
        delta = delta.div_ceil(2);
        exp += 1;
    }
    exp
}

/// Picks the smallest exponent, starting from the seed, whose grid keeps
/// the box under the fan-out budget.
///
/// `range` must be normalized (`lo <= hi` on every axis).
pub fn select_exponent(range: &[AxisRange]) -> u32 {
    let mut exp = seed_exponent(range);
    while exp < 64 && cell_count(range, exp) >= FAN_OUT_BUDGET {
        exp += 1;
    }
    exp
}
