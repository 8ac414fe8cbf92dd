//! In-process embedding cache.
//!
//! Keyed by document id and qualified model name so vectors from different
//! model versions never mix. Each entry also records a fingerprint of the
//! text it was computed from; a document re-posted under the same id with new
//! text is treated as a miss.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use crate::hashing::fnv1a;
use crate::model::{Embedding, ModelInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    doc_id: String,
    model: String,
}

#[derive(Debug, Clone)]
struct CachedEmbedding {
    fingerprint: u64,
    embedding: Embedding,
}

/// Hit/miss counters for an [`EmbeddingCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// LRU cache of document embeddings.
///
/// A capacity of zero disables caching; every lookup misses.
#[derive(Debug)]
pub struct EmbeddingCache {
    entries: Option<LruCache<CacheKey, CachedEmbedding>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    fn key(doc_id: &str, model: &ModelInfo) -> CacheKey {
        CacheKey {
            doc_id: doc_id.to_string(),
            model: model.qualified_name(),
        }
    }

    /// Look up the embedding of `text` stored for `doc_id` under `model`.
    pub fn get(&mut self, doc_id: &str, model: &ModelInfo, text: &str) -> Option<Embedding> {
        let fingerprint = fnv1a(text.as_bytes());
        let key = Self::key(doc_id, model);

        let found = self
            .entries
            .as_mut()
            .and_then(|entries| entries.get(&key))
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| cached.embedding.clone());

        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Store an embedding, evicting the least recently used entry when full.
    pub fn insert(&mut self, doc_id: &str, model: &ModelInfo, text: &str, embedding: Embedding) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        let key = Self::key(doc_id, model);
        let value = CachedEmbedding {
            fingerprint: fnv1a(text.as_bytes()),
            embedding,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), value) {
            if evicted != key {
                debug!(doc_id = %evicted.doc_id, "Evicted cached embedding");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.entries.as_ref().map_or(0, |e| e.len()),
            capacity: self.entries.as_ref().map_or(0, |e| e.cap().get()),
        }
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
        self.hits = 0;
        self.misses = 0;
    }
}
