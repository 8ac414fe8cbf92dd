//! Embedding error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading a model or embedding text.
///
/// Only a failure on the reference text aborts a matching session; pool
/// documents that fail are skipped by the caller.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model config present but unreadable as a BERT config
    #[error("Invalid model config {path}: {reason}")]
    InvalidModelConfig { path: PathBuf, reason: String },

    #[error("Failed to download {file} from {repo}: {reason}")]
    Download {
        repo: String,
        file: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad argument, e.g. a zero embedding dimension
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
