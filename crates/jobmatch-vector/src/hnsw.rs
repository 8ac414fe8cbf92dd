//! HNSW index implementation using usearch.
//!
//! In-memory only; built per session and dropped with it. Distances come
//! back as squared L2 from usearch and are converted to plain Euclidean
//! distance so both backends report the same numbers. Results are
//! approximate for large pools.
//!
//! Default parameters favor quality over speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)

use jobmatch_embeddings::Embedding;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{check_dimensions, sort_neighbors, IndexBackend, IndexStats, Neighbor, VectorIndex};

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
        }
    }
}

impl HnswConfig {
    pub fn with_connectivity(mut self, m: usize) -> Self {
        self.connectivity = m;
        self
    }

    pub fn with_expansion(mut self, ef_add: usize, ef_search: usize) -> Self {
        self.expansion_add = ef_add;
        self.expansion_search = ef_search;
        self
    }

    fn options(&self, dimensions: usize) -> IndexOptions {
        IndexOptions {
            dimensions,
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false, // Single vector per key
        }
    }
}

/// HNSW index wrapper around usearch.
///
/// Keys are pool positions. An empty pool holds no usearch index at all.
pub struct HnswIndex {
    index: Option<Index>,
    dimension: usize,
    len: usize,
}

impl HnswIndex {
    /// Build a graph over `embeddings`.
    pub fn build(config: &HnswConfig, embeddings: &[Embedding]) -> Result<Self, VectorError> {
        let dimension = check_dimensions(embeddings)?;
        if embeddings.is_empty() {
            return Ok(Self {
                index: None,
                dimension,
                len: 0,
            });
        }

        let index =
            Index::new(&config.options(dimension)).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .reserve(embeddings.len())
            .map_err(|e| VectorError::Index(e.to_string()))?;

        for (position, embedding) in embeddings.iter().enumerate() {
            index
                .add(position as u64, &embedding.values)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        info!(count = embeddings.len(), dim = dimension, "Built HNSW index");
        Ok(Self {
            index: Some(index),
            dimension,
            len: embeddings.len(),
        })
    }
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }

    fn query(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>, VectorError> {
        let Some(index) = self.index.as_ref() else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.dimension() != self.dimension {
            return Err(VectorError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let k = k.min(self.len);
        let mut fetch = k;
        let mut neighbors = loop {
            let mut hits = search(index, query, fetch)?;
            sort_neighbors(&mut hits);

            // usearch picks arbitrarily among equal distances at the cut-off;
            // widen until the whole tie group is in hand so position decides
            let tie_at_cutoff = hits.len() == fetch
                && fetch < self.len
                && hits.last().map(|n| n.distance) == hits.get(k - 1).map(|n| n.distance);
            if !tie_at_cutoff {
                break hits;
            }
            fetch = fetch.saturating_mul(2).min(self.len);
        };
        neighbors.truncate(k);

        debug!(k = k, found = neighbors.len(), "HNSW search complete");
        Ok(neighbors)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.len,
            dimension: self.dimension,
            backend: "hnsw",
        }
    }
}

fn search(index: &Index, query: &Embedding, count: usize) -> Result<Vec<Neighbor>, VectorError> {
    let matches = index
        .search(&query.values, count)
        .map_err(|e| VectorError::Index(e.to_string()))?;

    Ok(matches
        .keys
        .iter()
        .zip(matches.distances.iter())
        .map(|(&key, &dist_sq)| Neighbor::new(key as usize, dist_sq.max(0.0).sqrt()))
        .collect())
}

/// Backend producing [`HnswIndex`] instances.
#[derive(Debug, Clone, Default)]
pub struct HnswBackend {
    pub config: HnswConfig,
}

impl HnswBackend {
    pub fn new(config: HnswConfig) -> Self {
        Self { config }
    }
}

impl IndexBackend for HnswBackend {
    fn name(&self) -> &'static str {
        "hnsw"
    }

    fn build(&self, embeddings: &[Embedding]) -> Result<Box<dyn VectorIndex>, VectorError> {
        Ok(Box::new(HnswIndex::build(&self.config, embeddings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::FlatIndex;

    fn random_embedding(dim: usize) -> Embedding {
        use rand::Rng;
        let mut rng = rand::rng();
        let values: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() - 0.5).collect();
        Embedding::new(values)
    }

    #[test]
    fn test_empty_index() {
        let index = HnswIndex::build(&HnswConfig::default(), &[]).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&random_embedding(16), 3).unwrap().is_empty());
    }

    #[test]
    fn test_add_and_search() {
        let embeddings: Vec<Embedding> = (0..10).map(|_| random_embedding(64)).collect();
        let index = HnswIndex::build(&HnswConfig::default(), &embeddings).unwrap();
        assert_eq!(index.len(), 10);

        let results = index.query(&random_embedding(64), 5).unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_k_larger_than_pool() {
        let embeddings: Vec<Embedding> = (0..3).map(|_| random_embedding(16)).collect();
        let index = HnswIndex::build(&HnswConfig::default(), &embeddings).unwrap();
        assert_eq!(index.query(&random_embedding(16), 10).unwrap().len(), 3);
    }

    #[test]
    fn test_distances_match_flat_index() {
        let embeddings: Vec<Embedding> = (0..12).map(|_| random_embedding(32)).collect();
        let hnsw = HnswIndex::build(&HnswConfig::default(), &embeddings).unwrap();
        let flat = FlatIndex::build(&embeddings).unwrap();

        let query = embeddings[4].clone();
        let approx = hnsw.query(&query, 1).unwrap();
        let exact = flat.query(&query, 1).unwrap();

        assert_eq!(approx[0].position, exact[0].position);
        assert!((approx[0].distance - exact[0].distance).abs() < 1e-3);
    }

    #[test]
    fn test_ties_at_cutoff_keep_build_order() {
        let mut embeddings = vec![Embedding::new(vec![0.0, 1.0, 0.0, 0.0])];
        embeddings.extend((0..30).map(|_| Embedding::new(vec![1.0, 0.0, 0.0, 0.0])));
        let index = HnswIndex::build(&HnswConfig::default(), &embeddings).unwrap();
        let query = embeddings[1].clone();

        for (k, expected) in [(1, vec![1]), (3, vec![1, 2, 3]), (5, vec![1, 2, 3, 4, 5])] {
            let positions: Vec<usize> = index
                .query(&query, k)
                .unwrap()
                .iter()
                .map(|n| n.position)
                .collect();
            assert_eq!(positions, expected, "k = {k}");
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let embeddings = vec![random_embedding(64), random_embedding(32)];
        let result = HnswIndex::build(&HnswConfig::default(), &embeddings);
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
    }
}
