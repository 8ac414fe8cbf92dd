//! # jobmatch-types
//!
//! Shared domain types for jobmatch.
//!
//! - Documents and candidate pools produced by the scraping side
//! - Match results and the report handed to the delivery side
//! - Layered settings
//!
//! ## Usage
//!
//! ```rust
//! use jobmatch_types::{CandidatePool, Document};
//!
//! let pool = CandidatePool::new(vec![Document::new("https://jobs/1", "Analyst", "SQL")]).unwrap();
//! assert_eq!(pool.len(), 1);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod result;

pub use config::{
    EmbedderKind, EmbeddingSettings, IndexKind, IndexSettings, MatchingSettings, Settings,
    SimilarityKind,
};
pub use document::{normalize_whitespace, CandidatePool, Document};
pub use error::MatchError;
pub use result::{FinalSet, MatchReport, MatchResult};
