//! Nearest-neighbor retrieval of candidate documents.
//!
//! Embeds the reference and the pool, builds an index over the pool and
//! returns the closest documents nearest-first. Embedding failures for
//! individual documents drop that document only.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use jobmatch_embeddings::{CacheStats, Embedding, EmbeddingCache, EmbeddingModel};
use jobmatch_types::{CandidatePool, MatchResult};
use jobmatch_vector::{check_dimensions, FlatBackend, IndexBackend, VectorError};

use crate::error::RetrievalError;
use crate::similarity::Candidate;

/// Retrieval tuning.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Neighbors closer than this are discarded (0.0 keeps everything)
    pub min_distance: f32,
    /// Reference embeddings with a norm at or below this are low-confidence
    pub degenerate_norm: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            degenerate_norm: 1e-6,
        }
    }
}

/// Ranked candidates from one retrieval.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Nearest-first, ranks 0..
    pub candidates: Vec<Candidate>,
    /// Number of documents in the pool
    pub pool_size: usize,
    /// Documents that could not be embedded
    pub skipped: usize,
    /// The reference carried no usable signal
    pub low_confidence: bool,
}

impl Retrieval {
    pub fn results(&self) -> impl Iterator<Item = &MatchResult> {
        self.candidates.iter().map(|c| &c.result)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Similarity of the reference to one pool document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentScore {
    pub id: String,
    pub title: String,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
    /// Euclidean distance between the unit embeddings
    pub distance: f32,
}

/// Pool embeddings aligned with their pool positions.
struct EmbeddedPool {
    positions: Vec<usize>,
    embeddings: Vec<Embedding>,
    skipped: usize,
}

/// Embeds, indexes and queries a candidate pool.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingModel>,
    backend: Box<dyn IndexBackend>,
    cache: Mutex<EmbeddingCache>,
    config: RetrieverConfig,
}

impl Retriever {
    /// Exact index, no embedding cache, default tuning.
    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            embedder,
            backend: Box::new(FlatBackend),
            cache: Mutex::new(EmbeddingCache::disabled()),
            config: RetrieverConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn IndexBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn embedder(&self) -> &dyn EmbeddingModel {
        self.embedder.as_ref()
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    fn lock_cache(&self) -> MutexGuard<'_, EmbeddingCache> {
        // A panic mid-insert leaves the cache usable
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Embed the reference text, flagging zero-signal vectors.
    fn embed_reference(&self, reference_text: &str) -> Result<(Embedding, bool), RetrievalError> {
        let reference = self
            .embedder
            .embed(reference_text)
            .map_err(RetrievalError::Reference)?;

        let degenerate = reference.is_degenerate(self.config.degenerate_norm);
        if degenerate {
            warn!(
                norm = reference.norm(),
                chars = reference_text.len(),
                "Reference text embeds to a degenerate vector, results are low-confidence"
            );
        }
        Ok((reference, degenerate))
    }

    /// Embed every pool document, reusing cached vectors where possible.
    fn embed_pool(&self, pool: &CandidatePool) -> EmbeddedPool {
        let model = self.embedder.info();
        let mut slots: Vec<Option<Embedding>> = vec![None; pool.len()];
        let mut misses = Vec::new();

        {
            let mut cache = self.lock_cache();
            for (position, doc) in pool.iter().enumerate() {
                match cache.get(&doc.id, model, &doc.text) {
                    Some(embedding) => slots[position] = Some(embedding),
                    None => misses.push(position),
                }
            }
        }

        let mut skipped = 0;
        if !misses.is_empty() {
            let texts: Vec<&str> = misses
                .iter()
                .map(|&p| pool.documents()[p].text.as_str())
                .collect();
            let embedded = self.embedder.embed_all(&texts);

            let mut cache = self.lock_cache();
            for (&position, outcome) in misses.iter().zip(embedded) {
                let doc = &pool.documents()[position];
                match outcome {
                    Ok(embedding) => {
                        cache.insert(&doc.id, model, &doc.text, embedding.clone());
                        slots[position] = Some(embedding);
                    }
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "Skipping document that failed to embed");
                        skipped += 1;
                    }
                }
            }
        }

        debug!(
            pool = pool.len(),
            embedded = misses.len(),
            cached = pool.len() - misses.len(),
            skipped,
            "Pool embedded"
        );

        let (positions, embeddings): (Vec<usize>, Vec<Embedding>) = slots
            .into_iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.map(|e| (position, e)))
            .unzip();

        EmbeddedPool {
            positions,
            embeddings,
            skipped,
        }
    }

    /// Up to `min(k, pool size)` documents nearest the reference.
    pub fn retrieve(
        &self,
        reference_text: &str,
        pool: &CandidatePool,
        k: usize,
    ) -> Result<Retrieval, RetrievalError> {
        if pool.is_empty() || k == 0 {
            debug!(pool = pool.len(), k, "Nothing to retrieve");
            return Ok(Retrieval {
                pool_size: pool.len(),
                ..Default::default()
            });
        }

        let (reference, low_confidence) = self.embed_reference(reference_text)?;
        let embedded = self.embed_pool(pool);

        let index = self.backend.build(&embedded.embeddings)?;
        let neighbors = index.query(&reference, k.min(index.len()))?;

        let candidates: Vec<Candidate> = neighbors
            .into_iter()
            .filter(|n| n.distance >= self.config.min_distance)
            .enumerate()
            .map(|(rank, n)| {
                let document = pool.documents()[embedded.positions[n.position]].clone();
                Candidate::new(
                    MatchResult::new(document, rank, n.distance),
                    Some(embedded.embeddings[n.position].clone()),
                )
            })
            .collect();

        info!(
            backend = self.backend.name(),
            pool = pool.len(),
            k,
            found = candidates.len(),
            skipped = embedded.skipped,
            "Retrieval complete"
        );

        Ok(Retrieval {
            candidates,
            pool_size: pool.len(),
            skipped: embedded.skipped,
            low_confidence,
        })
    }

    /// Similarity of the reference to every embeddable document, in pool order.
    pub fn score_all(
        &self,
        reference_text: &str,
        pool: &CandidatePool,
    ) -> Result<Vec<DocumentScore>, RetrievalError> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let (reference, _) = self.embed_reference(reference_text)?;
        let embedded = self.embed_pool(pool);

        let dimension = check_dimensions(&embedded.embeddings)?;
        if !embedded.embeddings.is_empty() && reference.dimension() != dimension {
            return Err(VectorError::QueryDimensionMismatch {
                expected: dimension,
                actual: reference.dimension(),
            }
            .into());
        }

        Ok(embedded
            .positions
            .iter()
            .zip(&embedded.embeddings)
            .map(|(&position, embedding)| {
                let doc = &pool.documents()[position];
                DocumentScore {
                    id: doc.id.clone(),
                    title: doc.title.clone(),
                    similarity: reference.cosine_similarity(embedding),
                    distance: reference.euclidean_distance(embedding),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmatch_embeddings::{EmbeddingError, HashingEmbedder, ModelInfo};
    use jobmatch_types::Document;
    use jobmatch_vector::HnswBackend;

    fn pool(texts: &[&str]) -> CandidatePool {
        CandidatePool::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Document::new(format!("https://jobs/{i}"), format!("Job {i}"), *t))
                .collect(),
        )
        .unwrap()
    }

    fn hashing() -> Arc<dyn EmbeddingModel> {
        Arc::new(HashingEmbedder::new(128).unwrap())
    }

    /// Fails on texts containing "corrupt"; otherwise defers to hashing.
    struct PickyEmbedder {
        inner: HashingEmbedder,
    }

    impl EmbeddingModel for PickyEmbedder {
        fn info(&self) -> &ModelInfo {
            self.inner.info()
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            if text.contains("corrupt") {
                return Err(EmbeddingError::InvalidInput("corrupt page".to_string()));
            }
            self.inner.embed(text)
        }
    }

    /// Returns vectors whose length depends on the text.
    struct RaggedEmbedder {
        info: ModelInfo,
    }

    impl EmbeddingModel for RaggedEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            Ok(Embedding::new(vec![1.0; text.len().max(1)]))
        }
    }

    #[test]
    fn test_empty_pool() {
        let retriever = Retriever::new(hashing());
        let retrieval = retriever.retrieve("resume", &CandidatePool::empty(), 5).unwrap();
        assert!(retrieval.is_empty());
        assert_eq!(retrieval.pool_size, 0);
    }

    #[test]
    fn test_k_capped_by_pool_size() {
        let retriever = Retriever::new(hashing());
        let p = pool(&["python sql", "flight attendant", "marina manager"]);
        let retrieval = retriever.retrieve("python", &p, 10).unwrap();
        assert_eq!(retrieval.len(), 3);
    }

    #[test]
    fn test_nearest_first_with_ranks() {
        let retriever = Retriever::new(hashing());
        let p = pool(&[
            "flight attendant aircraft doors",
            "data scientist python pandas",
            "marina resident manager",
            "machine learning engineer python",
        ]);
        let retrieval = retriever.retrieve("data scientist python pandas", &p, 4).unwrap();

        assert_eq!(retrieval.candidates[0].id(), "https://jobs/1");
        assert!(retrieval.candidates[0].result.distance < 1e-5);
        for (rank, c) in retrieval.candidates.iter().enumerate() {
            assert_eq!(c.result.rank, rank);
        }
        let distances: Vec<f32> = retrieval.results().map(|r| r.distance).collect();
        for pair in distances.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_min_distance_floor() {
        let retriever = Retriever::new(hashing()).with_config(RetrieverConfig {
            min_distance: 0.05,
            ..Default::default()
        });
        let p = pool(&["rust developer", "java developer"]);
        let retrieval = retriever.retrieve("rust developer", &p, 2).unwrap();

        assert_eq!(retrieval.len(), 1);
        assert_eq!(retrieval.candidates[0].id(), "https://jobs/1");
        assert_eq!(retrieval.candidates[0].result.rank, 0);
    }

    #[test]
    fn test_degenerate_reference_is_low_confidence() {
        let retriever = Retriever::new(hashing());
        let p = pool(&["rust developer", "java developer"]);
        let retrieval = retriever.retrieve("", &p, 2).unwrap();
        assert!(retrieval.low_confidence);
        assert_eq!(retrieval.len(), 2);
    }

    #[test]
    fn test_failed_documents_skipped() {
        let embedder = Arc::new(PickyEmbedder {
            inner: HashingEmbedder::new(64).unwrap(),
        });
        let retriever = Retriever::new(embedder);
        let p = pool(&["rust developer", "corrupt page", "go developer"]);
        let retrieval = retriever.retrieve("rust", &p, 5).unwrap();

        assert_eq!(retrieval.skipped, 1);
        assert_eq!(retrieval.len(), 2);
        assert!(retrieval.candidates.iter().all(|c| c.id() != "https://jobs/1"));
    }

    #[test]
    fn test_dimension_mismatch_surfaces() {
        let embedder = Arc::new(RaggedEmbedder {
            info: ModelInfo {
                name: "ragged".to_string(),
                version: "0".to_string(),
                dimension: 0,
                max_sequence_length: 16,
            },
        });
        let retriever = Retriever::new(embedder);
        let p = pool(&["ab", "abc"]);
        let result = retriever.retrieve("ab", &p, 2);
        assert!(matches!(
            result,
            Err(RetrievalError::Vector(VectorError::DimensionMismatch { .. }))
        ));
    }

    fn ragged() -> Arc<dyn EmbeddingModel> {
        Arc::new(RaggedEmbedder {
            info: ModelInfo {
                name: "ragged".to_string(),
                version: "0".to_string(),
                dimension: 0,
                max_sequence_length: 16,
            },
        })
    }

    #[test]
    fn test_score_all_rejects_mixed_pool_dimensions() {
        let retriever = Retriever::new(ragged());
        let p = pool(&["ab", "abcdef"]);
        let result = retriever.score_all("ab", &p);
        assert!(matches!(
            result,
            Err(RetrievalError::Vector(VectorError::DimensionMismatch {
                position: 1,
                expected: 2,
                actual: 6
            }))
        ));
    }

    #[test]
    fn test_score_all_rejects_reference_dimension() {
        let retriever = Retriever::new(ragged());
        let p = pool(&["abcd", "wxyz"]);
        let result = retriever.score_all("ab", &p);
        assert!(matches!(
            result,
            Err(RetrievalError::Vector(VectorError::QueryDimensionMismatch {
                expected: 4,
                actual: 2
            }))
        ));
    }

    #[test]
    fn test_cache_reused_across_runs() {
        let retriever = Retriever::new(hashing()).with_cache(EmbeddingCache::new(16));
        let p = pool(&["rust developer", "java developer"]);

        retriever.retrieve("rust", &p, 2).unwrap();
        retriever.retrieve("java", &p, 2).unwrap();

        let stats = retriever.cache_stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_hnsw_backend_agrees_on_top_hit() {
        let retriever = Retriever::new(hashing()).with_backend(Box::new(HnswBackend::default()));
        let p = pool(&["rust developer tokio", "java spring", "python pandas"]);
        let retrieval = retriever.retrieve("python pandas", &p, 3).unwrap();
        assert_eq!(retrieval.candidates[0].id(), "https://jobs/2");
    }

    #[test]
    fn test_score_all_in_pool_order() {
        let retriever = Retriever::new(hashing());
        let p = pool(&["python pandas", "flight attendant"]);
        let scores = retriever.score_all("python pandas", &p).unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].id, "https://jobs/0");
        assert!((scores[0].similarity - 1.0).abs() < 1e-5);
        assert!(scores[0].similarity > scores[1].similarity);
    }
}
