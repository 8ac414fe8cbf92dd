//! Vector index traits and types.
//!
//! An index is built once over a pool's embeddings and is read-only
//! afterwards. Positions in query results refer back to the order of the
//! embeddings passed to `build`.
//!
//! Distance metric: Euclidean (L2) distance. Embeddings are unit-normalized,
//! so distances fall in `[0, 2]` and order the same way as cosine distance.

use std::cmp::Ordering;

use jobmatch_embeddings::Embedding;

use crate::error::VectorError;

/// One nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the embedding in the slice the index was built from
    pub position: usize,
    /// Euclidean distance to the query (lower = more similar)
    pub distance: f32,
}

impl Neighbor {
    pub fn new(position: usize, distance: f32) -> Self {
        Self { position, distance }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension (0 for an empty index)
    pub dimension: usize,
    /// Backend name
    pub backend: &'static str,
}

/// Read-only nearest-neighbor index.
///
/// Implementations must be safe to query from several threads at once.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` nearest neighbors, ascending by distance.
    ///
    /// Returns every member when the index holds fewer than `k`. Equal
    /// distances keep build order.
    fn query(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>, VectorError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;
}

/// Builds an index over a complete set of embeddings.
pub trait IndexBackend: Send + Sync {
    /// Backend name for logs and stats
    fn name(&self) -> &'static str;

    /// Build an index. All embeddings must share one dimension.
    fn build(&self, embeddings: &[Embedding]) -> Result<Box<dyn VectorIndex>, VectorError>;
}

/// Check that every embedding has the dimension of the first one.
///
/// Returns that dimension, or 0 for an empty slice.
pub fn check_dimensions(embeddings: &[Embedding]) -> Result<usize, VectorError> {
    let Some(first) = embeddings.first() else {
        return Ok(0);
    };
    let expected = first.dimension();

    for (position, embedding) in embeddings.iter().enumerate() {
        if embedding.dimension() != expected {
            return Err(VectorError::DimensionMismatch {
                position,
                expected,
                actual: embedding.dimension(),
            });
        }
    }
    Ok(expected)
}

/// Order neighbors by distance, then by position.
pub fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(compare_neighbors);
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.cmp(&b.position))
}
