//! # jobmatch-vector
//!
//! Nearest-neighbor indexes over document embeddings.
//!
//! An index is built once per matching session from the embedded candidate
//! pool and then only queried. Two backends implement [`IndexBackend`]:
//! - [`FlatBackend`]: exact linear scan, the default
//! - [`HnswBackend`]: usearch HNSW graph for larger pools
//!
//! Both report Euclidean distance between unit-normalized embeddings and
//! break distance ties by pool position.

pub mod error;
pub mod flat;
pub mod hnsw;
pub mod index;

pub use error::VectorError;
pub use flat::{FlatBackend, FlatIndex};
pub use hnsw::{HnswBackend, HnswConfig, HnswIndex};
pub use index::{check_dimensions, sort_neighbors, IndexBackend, IndexStats, Neighbor, VectorIndex};
