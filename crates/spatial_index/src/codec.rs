//! Z-order (Morton) key codec.
//!
//! Coordinates are interleaved bit by bit, most significant bit first:
//! bit `precision - 1` of axis 0, then of axis 1, and so on, cycling through
//! the axes down to bit 0. The resulting bit string is rendered as fixed-width
//! lowercase hex, so comparing two keys as strings gives the same order as
//! comparing their positions along the curve.
//!
//! When `precision * dimensions` is not a multiple of four the bit string is
//! padded with leading zero bits up to the next hex digit. Leading padding
//! keeps the ordering intact.

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Stateless encoder for one coordinate space shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    dimensions: usize,
    precision: u32,
}

impl Codec {
    /// Creates a codec for `dimensions` axes of `precision` bits each.
    ///
    /// Callers outside the crate get a codec from a validated
    /// [`IndexConfig`] through [`SpatialIndex::codec`](crate::SpatialIndex::codec).
    pub(crate) fn new(dimensions: usize, precision: u32) -> Self {
        debug_assert!(dimensions > 0, "codec needs at least one axis");
        debug_assert!((1..=64).contains(&precision), "precision must fit a u64");
        Self {
            dimensions,
            precision,
        }
    }

    /// Creates a codec matching an index configuration
    pub(crate) fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.dimensions, config.precision)
    }

    /// Largest coordinate value that fits in `precision` bits
    pub fn max_coordinate(&self) -> u64 {
        if self.precision >= 64 {
            u64::MAX
        } else {
            (1u64 << self.precision) - 1
        }
    }

    /// Width of every encoded key in hex characters
    pub fn key_width(&self) -> usize {
        (self.precision as usize * self.dimensions).div_ceil(4)
    }

    fn padding_bits(&self) -> usize {
        self.key_width() * 4 - self.precision as usize * self.dimensions
    }

    /// Checks that `coordinates` has one in-range value per axis
    pub fn check(&self, coordinates: &[u64]) -> IndexResult<()> {
        if coordinates.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: coordinates.len(),
            });
        }
        let max = self.max_coordinate();
        if let Some((axis, &value)) = coordinates.iter().enumerate().find(|(_, v)| **v > max) {
            return Err(IndexError::CoordinateOutOfRange {
                axis,
                value,
                precision: self.precision,
            });
        }
        Ok(())
    }

    /// Encodes a coordinate tuple into its hex Z-order key
    pub fn encode(&self, coordinates: &[u64]) -> IndexResult<String> {
        self.check(coordinates)?;
        Ok(self.interleave(coordinates))
    }

    /// Interleaves coordinates that are already known to be valid
    pub(crate) fn interleave(&self, coordinates: &[u64]) -> String {
        let mut key = String::with_capacity(self.key_width());
        let mut nibble = 0u8;
        let mut filled = self.padding_bits();

        for bit in (0..self.precision).rev() {
            for &value in coordinates {
                nibble = (nibble << 1) | ((value >> bit) & 1) as u8;
                filled += 1;
                if filled == 4 {
                    key.push(HEX_DIGITS[nibble as usize] as char);
                    nibble = 0;
                    filled = 0;
                }
            }
        }

        key
    }

    /// Reverses [`encode`](Self::encode).
    ///
    /// Returns `None` when `key` has the wrong width, contains a non-hex
    /// character, or sets any of the leading padding bits.
    pub fn decode(&self, key: &str) -> Option<Vec<u64>> {
        if key.len() != self.key_width() {
            return None;
        }

        let padding = self.padding_bits();
        let dims = self.dimensions;
        let mut coordinates = vec![0u64; dims];
        let mut position = 0usize;

        for c in key.chars() {
            let digit = c.to_digit(16)?;
            for shift in (0..4).rev() {
                let bit = u64::from((digit >> shift) & 1);
                if position < padding {
                    if bit != 0 {
                        return None;
                    }
                } else {
                    let index = position - padding;
                    let axis = index % dims;
                    let level = self.precision as usize - 1 - index / dims;
                    coordinates[axis] |= bit << level;
                }
                position += 1;
            }
        }

        Some(coordinates)
    }
}
