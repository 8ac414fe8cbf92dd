//! Retrieval error types.

use thiserror::Error;

use jobmatch_embeddings::EmbeddingError;
use jobmatch_vector::VectorError;

/// Errors that abort a matching session.
///
/// Per-document embedding failures are not errors; those documents are
/// skipped and counted instead.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The reference text could not be embedded
    #[error("Failed to embed reference: {0}")]
    Reference(#[source] EmbeddingError),

    /// Index build or query failed (including dimension mismatches)
    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
