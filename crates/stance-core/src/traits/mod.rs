//! Traits at the seams of the system.
//!
//! The five collaborator traits are implemented outside this workspace
//! (network-backed in production, hand-rolled in tests) and injected at
//! pipeline construction. `ViewpointStore` is implemented by stance-store.

mod classifier;
mod crawler;
mod embedder;
mod generator;
mod scorer;
mod store;

pub use classifier::{Classification, Classifier};
pub use crawler::Crawler;
pub use embedder::Embedder;
pub use generator::Generator;
pub use scorer::{ScoreJudgment, Scorer};
pub use store::ViewpointStore;
