use crate::errors::StanceResult;

/// External text-corpus crawler collaborator.
pub trait Crawler: Send + Sync {
    /// Search the corpus, returning zero or more passages. No count is
    /// guaranteed; an empty result is not an error.
    fn search(&self, query: &str) -> StanceResult<Vec<String>>;
}
