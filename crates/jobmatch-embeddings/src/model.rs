//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from text.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EmbeddingError;

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length unless all zero)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        let normalized = if norm > 0.0 && norm.is_finite() {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (for pre-normalized vectors)
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// All-zero embedding, used for texts that carry no signal.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            values: vec![0.0; dimension],
        }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean length of the vector.
    pub fn norm(&self) -> f32 {
        l2_norm(&self.values)
    }

    /// True when the vector is too short (or non-finite) to point anywhere.
    pub fn is_degenerate(&self, min_norm: f32) -> bool {
        let norm = self.norm();
        !norm.is_finite() || norm <= min_norm
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical), 0 when either side is zero.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        // Both sides are unit length or zero, so the dot product is the cosine
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Euclidean distance to another embedding of the same dimension.
    /// Infinite when the dimensions differ.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Model information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Model version; embeddings from different versions never mix
    pub version: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

impl ModelInfo {
    /// `name@version`, used as the model part of cache keys.
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Trait for embedding models.
///
/// Implementations must be deterministic for a given text and model version,
/// and thread-safe (Send + Sync) for concurrent use.
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    ///
    /// Empty text must produce a valid vector rather than an error.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch).
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Generate embeddings for multiple owned strings.
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed_batch(&refs)
    }

    /// Embed every text, isolating failures per text.
    ///
    /// Output is 1:1 with input. A failing batch is retried one text at a
    /// time so a single bad input cannot sink the rest.
    fn embed_all(&self, texts: &[&str]) -> Vec<Result<Embedding, EmbeddingError>> {
        match self.embed_batch(texts) {
            Ok(embeddings) if embeddings.len() == texts.len() => {
                embeddings.into_iter().map(Ok).collect()
            }
            Ok(embeddings) => {
                warn!(
                    expected = texts.len(),
                    got = embeddings.len(),
                    "Batch returned wrong number of embeddings, retrying individually"
                );
                texts.iter().map(|text| self.embed(text)).collect()
            }
            Err(e) => {
                warn!(error = %e, count = texts.len(), "Batch embedding failed, retrying individually");
                texts.iter().map(|text| self.embed(text)).collect()
            }
        }
    }
}
