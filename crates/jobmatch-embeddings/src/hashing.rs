//! Feature-hashing embedder.
//!
//! Maps lowercased word tokens into a fixed number of buckets with FNV-1a.
//! No model files, fully deterministic across runs and platforms. Useful as
//! an offline fallback and as a test double for the retrieval layer.

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Version tag; bump when tokenization or hashing changes.
pub const HASHING_VERSION: &str = "fnv1a-v1";

/// Bag-of-words embedder using signed feature hashing.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    info: ModelInfo,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            info: ModelInfo {
                name: "hashing".to_string(),
                version: HASHING_VERSION.to_string(),
                dimension,
                max_sequence_length: usize::MAX,
            },
        })
    }
}

pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl EmbeddingModel for HashingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let dim = self.info.dimension;
        let mut values = vec![0.0f32; dim];

        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % dim as u64) as usize;
            // Top bit picks the sign so collisions tend to cancel
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            values[bucket] += sign;
        }

        Ok(Embedding::new(values))
    }
}
