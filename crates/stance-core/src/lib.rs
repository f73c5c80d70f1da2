//! # stance-core
//!
//! Foundation crate for the stance evidence retrieval index.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{IndexConfig, RetrievalConfig};
pub use errors::{StanceError, StanceResult};
pub use models::{
    Evidence, EvidenceCandidate, EvidenceSource, NewEvidence, RankedEvidence, RetrievalOutcome,
    ScoreUpdateRecord, Theme, Trace, TraceStep, Viewpoint,
};
pub use traits::{Classifier, Crawler, Embedder, Generator, Scorer, ViewpointStore};
