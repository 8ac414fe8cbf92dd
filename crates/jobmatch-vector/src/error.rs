//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// An embedding passed to `build` disagrees with the first one
    #[error("Dimension mismatch at position {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    /// Query vector does not match the indexed dimension
    #[error("Query dimension mismatch: expected {expected}, got {actual}")]
    QueryDimensionMismatch { expected: usize, actual: usize },
}
