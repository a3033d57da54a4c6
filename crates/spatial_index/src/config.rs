//! Index configuration.
//!
//! An [`IndexConfig`] names the two store structures backing one index and
//! fixes the shape of the coordinate space. It is validated once when the
//! index is built and never changes afterwards.

use crate::codec::Codec;
use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};

/// Default bit width per coordinate
fn default_precision() -> u32 {
    64
}

/// Immutable configuration of a spatial index.
///
/// # Examples
///
/// ```rust
/// use spatial_index::IndexConfig;
///
/// let config = IndexConfig::new(2, "ships:index", "ships:members").with_precision(16);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.key_width(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of coordinate axes
    pub dimensions: usize,
    /// Bit width of every coordinate (1..=64)
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Key of the sorted collection holding member strings
    pub collection_key: String,
    /// Key of the hash map from entity id to member string
    pub hash_key: String,
}

impl IndexConfig {
    /// Creates a configuration with the default 64-bit precision
    pub fn new(
        dimensions: usize,
        collection_key: impl Into<String>,
        hash_key: impl Into<String>,
    ) -> Self {
        Self {
            dimensions,
            precision: default_precision(),
            collection_key: collection_key.into(),
            hash_key: hash_key.into(),
        }
    }

    /// Overrides the coordinate bit width
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Checks the configuration for consistency.
    ///
    /// Returns `InvalidConfig` when there are no axes, when the precision
    /// does not fit a `u64` coordinate, or when the store keys are empty or
    /// collide.
    pub fn validate(&self) -> IndexResult<()> {
        if self.dimensions == 0 {
            return Err(IndexError::InvalidConfig(
                "dimensions must be at least 1".to_string(),
            ));
        }
        if self.precision == 0 || self.precision > 64 {
            return Err(IndexError::InvalidConfig(format!(
                "precision must be between 1 and 64 bits, got {}",
                self.precision
            )));
        }
        if self.collection_key.is_empty() || self.hash_key.is_empty() {
            return Err(IndexError::InvalidConfig(
                "collection_key and hash_key cannot be empty".to_string(),
            ));
        }
        if self.collection_key == self.hash_key {
            return Err(IndexError::InvalidConfig(format!(
                "collection_key and hash_key must differ, both are {:?}",
                self.collection_key
            )));
        }
        Ok(())
    }

    /// Largest coordinate value representable at this precision
    pub fn max_coordinate(&self) -> u64 {
        Codec::from_config(self).max_coordinate()
    }

    /// Number of hex characters in an encoded key
    pub fn key_width(&self) -> usize {
        Codec::from_config(self).key_width()
    }
}
