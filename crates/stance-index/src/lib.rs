//! # stance-index
//!
//! The evidence retrieval index layer: two flat cosine-similarity indices
//! (keyword and viewpoint), an exact-match embedding cache, and the
//! consistency manager that detects and repairs desync between the indices
//! and the relational store.

pub mod cache;
pub mod consistency;
pub mod flat_index;
pub mod persist;
pub mod vector;

pub use cache::EmbeddingCache;
pub use consistency::{ConsistencyManager, IndexHealth, RepairKind};
pub use flat_index::SimilarityIndex;
