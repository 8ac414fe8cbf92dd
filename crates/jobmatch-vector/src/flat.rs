//! Exact brute-force index.
//!
//! Scans every stored vector per query. Pools here are tens to hundreds of
//! postings, so the linear scan is cheaper than building a graph.

use jobmatch_embeddings::Embedding;
use tracing::debug;

use crate::error::VectorError;
use crate::index::{check_dimensions, sort_neighbors, IndexBackend, IndexStats, Neighbor, VectorIndex};

/// Exact Euclidean nearest-neighbor index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
}

impl FlatIndex {
    /// Build over `embeddings`; positions follow slice order.
    pub fn build(embeddings: &[Embedding]) -> Result<Self, VectorError> {
        let dimension = check_dimensions(embeddings)?;
        debug!(count = embeddings.len(), dim = dimension, "Built flat index");
        Ok(Self {
            dimension,
            vectors: embeddings.to_vec(),
        })
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn query(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>, VectorError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.dimension() != self.dimension {
            return Err(VectorError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Neighbor::new(position, query.euclidean_distance(v)))
            .collect();

        sort_neighbors(&mut neighbors);
        neighbors.truncate(k);

        debug!(k = k, found = neighbors.len(), "Flat search complete");
        Ok(neighbors)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.vectors.len(),
            dimension: self.dimension,
            backend: "flat",
        }
    }
}

/// Backend producing [`FlatIndex`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatBackend;

impl IndexBackend for FlatBackend {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn build(&self, embeddings: &[Embedding]) -> Result<Box<dyn VectorIndex>, VectorError> {
        Ok(Box::new(FlatIndex::build(embeddings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_embedding(dim: usize) -> Embedding {
        use rand::Rng;
        let mut rng = rand::rng();
        let values: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() - 0.5).collect();
        Embedding::new(values)
    }

    #[test]
    fn test_empty_index() {
        let index = FlatIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        let results = index.query(&random_embedding(8), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_sorted_ascending() {
        let embeddings: Vec<Embedding> = (0..20).map(|_| random_embedding(16)).collect();
        let index = FlatIndex::build(&embeddings).unwrap();

        let results = index.query(&random_embedding(16), 7).unwrap();
        assert_eq!(results.len(), 7);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_k_larger_than_pool() {
        let embeddings: Vec<Embedding> = (0..3).map(|_| random_embedding(8)).collect();
        let index = FlatIndex::build(&embeddings).unwrap();
        let results = index.query(&random_embedding(8), 10).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let embeddings: Vec<Embedding> = (0..10).map(|_| random_embedding(8)).collect();
        let index = FlatIndex::build(&embeddings).unwrap();

        let results = index.query(&embeddings[6], 3).unwrap();
        assert_eq!(results[0].position, 6);
        assert!(results[0].distance < 1e-5);
    }

    #[test]
    fn test_ties_keep_build_order() {
        let same = Embedding::new(vec![1.0, 0.0]);
        let embeddings = vec![
            Embedding::new(vec![0.0, 1.0]),
            same.clone(),
            same.clone(),
            same,
        ];
        let index = FlatIndex::build(&embeddings).unwrap();

        let results = index.query(&Embedding::new(vec![1.0, 0.0]), 4).unwrap();
        let order: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_build_dimension_mismatch() {
        let embeddings = vec![random_embedding(8), random_embedding(4)];
        let result = FlatIndex::build(&embeddings);
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch { position: 1, .. })
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = FlatIndex::build(&[random_embedding(8)]).unwrap();
        let result = index.query(&random_embedding(4), 1);
        assert!(matches!(
            result,
            Err(VectorError::QueryDimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_backend_builds_boxed_index() {
        let backend = FlatBackend;
        let index = backend.build(&[random_embedding(8), random_embedding(8)]).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.stats().backend, "flat");
    }
}
