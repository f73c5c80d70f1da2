use crate::errors::StanceResult;

/// Synthetic-evidence generation collaborator.
pub trait Generator: Send + Sync {
    /// Produce exactly `count` well-formed synthetic statements supporting
    /// `viewpoint`, optionally seeded with the best candidate text from a
    /// prior fallback tier.
    ///
    /// Implementations must fail loudly (return `Err`) if they cannot
    /// return exactly `count` items; the chain treats a short or malformed
    /// batch as a hard generation failure either way.
    fn generate(
        &self,
        viewpoint: &str,
        seed: Option<&str>,
        count: usize,
    ) -> StanceResult<Vec<String>>;
}
