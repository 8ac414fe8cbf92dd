//! # jobmatch-retrieval
//!
//! Matches a reference document (a résumé) against a pool of candidates
//! (job postings).
//!
//! A session runs in three steps:
//! 1. [`Retriever`] embeds the reference and the pool, builds an index and
//!    fetches the `buffer_multiplier × count` nearest candidates
//! 2. [`Deduplicator`] walks them nearest-first and drops any candidate too
//!    similar to one already kept
//! 3. [`MatchPipeline`] trims the survivors to the requested count and wraps
//!    them in a [`jobmatch_types::MatchReport`]
//!
//! Documents that fail to embed are skipped and counted; only a reference
//! that cannot be embedded aborts the session.

pub mod dedup;
pub mod error;
pub mod pipeline;
pub mod retriever;
pub mod similarity;

pub use dedup::{
    DedupAccumulator, DedupDecision, DedupOutcome, Deduplicator, DEFAULT_DUPLICATE_THRESHOLD,
};
pub use error::RetrievalError;
pub use pipeline::{index_backend, MatchPipeline, DEFAULT_BUFFER_MULTIPLIER};
pub use retriever::{DocumentScore, Retrieval, Retriever, RetrieverConfig};
pub use similarity::{
    similarity_from_settings, Candidate, EmbeddingSimilarity, ExactTextSimilarity,
    ShingleSimilarity, TextSimilarity,
};
