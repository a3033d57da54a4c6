//! # Subspace Spatial Index
//!
//! An n-dimensional box index for the game server, kept in a remote store
//! that only offers lexicographic range scans over a sorted collection and
//! hash lookups.
//!
//! ## How it works
//!
//! - **Codec**: coordinates are bit-interleaved into a Z-order key rendered
//!   as fixed-width hex, so string order follows the curve.
//! - **Decomposition**: a query box is split into the aligned grid cells of
//!   side `2^exp` it overlaps; each cell is one contiguous key range.
//! - **Precision selection**: `exp` grows until the box touches fewer than
//!   20 cells, bounding the number of scans per query.
//! - **Filtering**: members carry their raw coordinates, so the scan results
//!   are filtered exactly against the box.
//!
//! ## Quick Start Example
//!
//! ```rust
//! use spatial_index::{AxisRange, IndexConfig, MemoryStore, SpatialIndex};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), spatial_index::IndexError> {
//! let config = IndexConfig::new(2, "ships:z", "ships:members").with_precision(16);
//! let index = SpatialIndex::new(Arc::new(MemoryStore::new()), config)?;
//!
//! index.insert(&[3, 5], "a").await?;
//! index.insert(&[10, 10], "b").await?;
//!
//! let hits = index.query(&[AxisRange::new(0, 8), AxisRange::new(0, 8)]).await?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, "a");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod decompose;
pub mod error;
pub mod index;
pub mod member;
pub mod precision;
pub mod store;
pub mod types;

pub use codec::Codec;
pub use config::IndexConfig;
pub use error::{IndexError, IndexResult, StoreError, StoreResult};
pub use index::SpatialIndex;
pub use precision::FAN_OUT_BUDGET;
pub use store::{BatchMode, Command, LexBound, LexRange, MemoryStore, Reply, StoreBackend};
pub use types::{AxisRange, IndexEntry};
