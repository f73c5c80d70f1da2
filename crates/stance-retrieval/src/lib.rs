//! # stance-retrieval
//!
//! The retrieval decision pipeline: theme, keyword, and viewpoint gates
//! over the similarity indices, pure evidence selection, and the
//! three-tier escalating fallback chain (store → crawler → generator).

pub mod fallback;
pub mod pacing;
pub mod pipeline;
pub mod selector;

pub use fallback::{FallbackChain, FallbackOutcome, Tier};
pub use pacing::TokenBucket;
pub use pipeline::RetrievalPipeline;
pub use selector::select_top;
