use crate::errors::StanceResult;

/// Text embedding collaborator.
///
/// The dimensionality may change between deployments; callers must
/// re-detect it with a sentinel call on every process start and never
/// assume a persisted index still matches.
pub trait Embedder: Send + Sync {
    /// Embed a single text. The returned vector is not necessarily
    /// normalized; the index layer normalizes before storing.
    fn embed(&self, text: &str) -> StanceResult<Vec<f32>>;
}
