//! Configuration for the index and retrieval subsystems.

mod index_config;
mod retrieval_config;

pub use index_config::IndexConfig;
pub use retrieval_config::RetrievalConfig;
