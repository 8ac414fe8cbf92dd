//! Retrieve, deduplicate, trim.
//!
//! The entry point callers use. Retrieval over-fetches by a configurable
//! multiple of the requested count because scraped boards are full of
//! re-posts; dedup then trims back to the requested count. When the pool
//! runs out of unique postings the smaller set is returned as-is.

use std::sync::Arc;

use tracing::{info, warn};

use jobmatch_embeddings::{EmbeddingCache, EmbeddingModel};
use jobmatch_types::{CandidatePool, IndexKind, IndexSettings, MatchReport, Settings};
use jobmatch_vector::{FlatBackend, HnswBackend, HnswConfig, IndexBackend};

use crate::dedup::{Deduplicator, DEFAULT_DUPLICATE_THRESHOLD};
use crate::error::RetrievalError;
use crate::retriever::{Retriever, RetrieverConfig};
use crate::similarity::{similarity_from_settings, EmbeddingSimilarity};

/// Default over-fetch factor ahead of dedup.
pub const DEFAULT_BUFFER_MULTIPLIER: usize = 2;

/// End-to-end matching: retriever followed by deduplicator.
pub struct MatchPipeline {
    retriever: Retriever,
    deduplicator: Deduplicator,
    buffer_multiplier: usize,
}

impl MatchPipeline {
    pub fn new(
        retriever: Retriever,
        deduplicator: Deduplicator,
        buffer_multiplier: usize,
    ) -> Result<Self, RetrievalError> {
        if buffer_multiplier == 0 {
            return Err(RetrievalError::Config(
                "buffer_multiplier must be > 0".to_string(),
            ));
        }
        Ok(Self {
            retriever,
            deduplicator,
            buffer_multiplier,
        })
    }

    /// Exact index, embedding-based dedup at the default threshold, 2x buffer.
    pub fn with_defaults(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            retriever: Retriever::new(embedder),
            deduplicator: Deduplicator::new(
                Box::new(EmbeddingSimilarity::default()),
                DEFAULT_DUPLICATE_THRESHOLD,
            ),
            buffer_multiplier: DEFAULT_BUFFER_MULTIPLIER,
        }
    }

    /// Wire a pipeline from loaded settings.
    pub fn from_settings(
        embedder: Arc<dyn EmbeddingModel>,
        settings: &Settings,
    ) -> Result<Self, RetrievalError> {
        let matching = &settings.matching;
        matching.validate().map_err(RetrievalError::Config)?;

        let retriever = Retriever::new(embedder)
            .with_backend(index_backend(&settings.index))
            .with_cache(EmbeddingCache::new(settings.embedding.cache_capacity))
            .with_config(RetrieverConfig {
                min_distance: matching.min_distance,
                degenerate_norm: matching.degenerate_norm,
            });
        let deduplicator =
            Deduplicator::new(similarity_from_settings(matching), matching.duplicate_threshold);

        Self::new(retriever, deduplicator, matching.buffer_multiplier)
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.deduplicator
    }

    pub fn buffer_multiplier(&self) -> usize {
        self.buffer_multiplier
    }

    /// Match `reference_text` against `pool`, returning at most
    /// `requested_count` mutually distinct documents nearest-first.
    pub fn run(
        &self,
        reference_text: &str,
        pool: &CandidatePool,
        requested_count: usize,
    ) -> Result<MatchReport, RetrievalError> {
        let model = self.retriever.embedder().info().qualified_name();
        let mut report = MatchReport::empty(model, requested_count);
        report.pool_size = pool.len();

        if pool.is_empty() {
            info!("Candidate pool is empty, no matches");
            return Ok(report);
        }

        let k = requested_count.saturating_mul(self.buffer_multiplier);
        let retrieval = self.retriever.retrieve(reference_text, pool, k)?;
        let retrieved = retrieval.len();

        let outcome = self.deduplicator.filter(retrieval.candidates, requested_count);

        if outcome.results.len() < requested_count {
            warn!(
                requested = requested_count,
                found = outcome.results.len(),
                "Fewer unique matches than requested"
            );
        }

        info!(
            requested = requested_count,
            retrieved,
            returned = outcome.results.len(),
            duplicates = outcome.duplicates_removed,
            low_confidence = retrieval.low_confidence,
            "Matching complete"
        );

        report.skipped = retrieval.skipped;
        report.low_confidence = retrieval.low_confidence;
        report.duplicates_removed = outcome.duplicates_removed;
        report.results = outcome.results;
        Ok(report)
    }
}

/// Build the index backend selected in settings.
pub fn index_backend(settings: &IndexSettings) -> Box<dyn IndexBackend> {
    match settings.backend {
        IndexKind::Flat => Box::new(FlatBackend),
        IndexKind::Hnsw => Box::new(HnswBackend::new(
            HnswConfig::default()
                .with_connectivity(settings.connectivity)
                .with_expansion(settings.expansion_add, settings.expansion_search),
        )),
    }
}
