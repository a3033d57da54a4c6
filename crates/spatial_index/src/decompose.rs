//! Range decomposition.
//!
//! A query box is covered by the aligned grid cells of side `2^exp` that it
//! overlaps. Inside one aligned cell every point shares the same high-order
//! interleaved bits, so the cell maps to one contiguous run of encoded keys
//! and can be fetched with a single lexicographic scan.

use crate::codec::Codec;
use crate::member::{key_ceiling, key_floor};
use crate::store::LexRange;
use crate::types::AxisRange;

/// Index of the grid cell containing `value` along one axis
pub fn cell_index(value: u64, exp: u32) -> u64 {
    if exp >= 64 {
        0
    } else {
        value >> exp
    }
}

/// Mask of the low-order bits inside a cell of side `2^exp`
fn cell_mask(exp: u32) -> u64 {
    if exp >= 64 {
        u64::MAX
    } else {
        (1u64 << exp) - 1
    }
}

/// Number of cells of side `2^exp` overlapping `range`, saturating
pub fn cell_count(range: &[AxisRange], exp: u32) -> u128 {
    range
        .iter()
        .map(|axis| {
            let axis = axis.normalized();
            u128::from(cell_index(axis.hi, exp) - cell_index(axis.lo, exp)) + 1
        })
        .fold(1u128, |acc, n| acc.saturating_mul(n))
}

/// Odometer over every grid cell overlapping a box.
///
/// Axis 0 turns fastest; when it passes its last cell it resets to its
/// first and carries into axis 1, and so on. Iteration ends when the last
/// axis overflows. Each cell is produced exactly once.
#[derive(Debug, Clone)]
pub struct GridCells {
    start: Vec<u64>,
    end: Vec<u64>,
    current: Option<Vec<u64>>,
}

impl GridCells {
    /// Axis bounds may be given in either order
    pub fn new(range: &[AxisRange], exp: u32) -> Self {
        let (start, end): (Vec<u64>, Vec<u64>) = range
            .iter()
            .map(|a| {
                let a = a.normalized();
                (cell_index(a.lo, exp), cell_index(a.hi, exp))
            })
            .unzip();
        let current = if start.is_empty() {
            None
        } else {
            Some(start.clone())
        };
        Self { start, end, current }
    }
}

impl Iterator for GridCells {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.current.take()?;

        let mut next = cell.clone();
        let mut done = true;
        for axis in 0..next.len() {
            if next[axis] != self.end[axis] {
                next[axis] += 1;
                done = false;
                break;
            }
            next[axis] = self.start[axis];
        }
        if !done {
            self.current = Some(next);
        }

        Some(cell)
    }
}

/// Inclusive corners of a grid cell, clipped to the coordinate space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBounds {
    pub min: Vec<u64>,
    pub max: Vec<u64>,
}

impl CellBounds {
    pub fn of(cell: &[u64], exp: u32, max_coordinate: u64) -> Self {
        let mask = cell_mask(exp);
        let min: Vec<u64> = cell
            .iter()
            .map(|&index| if exp >= 64 { 0 } else { index << exp })
            .collect();
        let max = min.iter().map(|&m| (m | mask).min(max_coordinate)).collect();
        Self { min, max }
    }
}

/// Turns a normalized box into one lexicographic scan per overlapping cell.
///
/// `range` must already be normalized and clipped to the codec's
/// coordinate space.
pub fn decompose(codec: &Codec, range: &[AxisRange], exp: u32) -> Vec<LexRange> {
    let max_coordinate = codec.max_coordinate();
    GridCells::new(range, exp)
        .map(|cell| {
            let bounds = CellBounds::of(&cell, exp, max_coordinate);
            let low = codec.interleave(&bounds.min);
            let high = codec.interleave(&bounds.max);
            LexRange::inclusive(key_floor(&low), key_ceiling(&high))
        })
        .collect()
}
