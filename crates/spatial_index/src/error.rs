//! Error types for the spatial index and its store adapter

use thiserror::Error;

/// Failures raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    #[error("Batch returned {actual} replies for {expected} commands")]
    BatchLength { expected: usize, actual: usize },
}

/// Errors surfaced by [`SpatialIndex`](crate::SpatialIndex) operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Please always use {expected} dimensions with this index (got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Coordinate {value} on axis {axis} does not fit in {precision} bits")]
    CoordinateOutOfRange {
        axis: usize,
        value: u64,
        precision: u32,
    },

    #[error("Element {0} not found")]
    NotFound(String),

    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// Result type aliases for convenience
pub type StoreResult<T> = Result<T, StoreError>;
pub type IndexResult<T> = Result<T, IndexError>;
