//! # jobmatch-embeddings
//!
//! Text embedding for jobmatch.
//!
//! Every document in a candidate pool, and the reference text, is mapped to
//! a fixed-dimension vector by an [`EmbeddingModel`].
//!
//! ## Features
//! - Local inference via Candle (no Python, no API)
//! - all-MiniLM-L6-v2 model (384 dimensions) with automatic file caching
//! - Deterministic feature-hashing fallback that needs no model files
//! - LRU cache of document embeddings keyed by id and model version

pub mod cache;
pub mod candle;
pub mod error;
pub mod hashing;
pub mod model;
pub mod store;

pub use crate::candle::CandleEmbedder;
pub use cache::{
    get_or_download_model, CacheStatus, ModelCache, ModelFile, ModelPaths, DEFAULT_MODEL_REPO,
    MODEL_REVISION,
};
pub use error::EmbeddingError;
pub use hashing::HashingEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
pub use store::{CacheStats, EmbeddingCache};
