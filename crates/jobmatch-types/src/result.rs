//! Match results handed to the delivery side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;

/// One retrieved document and where it landed in nearest-neighbor order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub document: Document,
    /// Position in nearest-neighbor order (0 = closest)
    pub rank: usize,
    /// Non-negative distance to the reference, larger = less similar
    pub distance: f32,
}

impl MatchResult {
    pub fn new(document: Document, rank: usize, distance: f32) -> Self {
        Self {
            document,
            rank,
            distance,
        }
    }
}

/// Deduplicated results, nearest first.
pub type FinalSet = Vec<MatchResult>;

/// Outcome of one matching session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Name and version of the embedding model used
    pub model: String,
    /// Number of results the caller asked for
    pub requested: usize,
    /// Number of documents in the candidate pool
    pub pool_size: usize,
    /// Documents dropped because they could not be embedded
    #[serde(default)]
    pub skipped: usize,
    /// Candidates rejected as near-duplicates
    #[serde(default)]
    pub duplicates_removed: usize,
    /// Set when the reference carried no usable signal
    #[serde(default)]
    pub low_confidence: bool,
    pub results: FinalSet,
}

impl MatchReport {
    /// A report with no results.
    pub fn empty(model: impl Into<String>, requested: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            model: model.into(),
            requested,
            pool_size: 0,
            skipped: 0,
            duplicates_removed: 0,
            low_confidence: false,
            results: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Document ids in result order.
    pub fn ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .map(|r| r.document.id.as_str())
            .collect()
    }
}
