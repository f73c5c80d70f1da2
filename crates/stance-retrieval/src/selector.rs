//! Pure evidence ranking and filtering.

use stance_core::errors::{SelectorError, StanceResult};
use stance_core::models::EvidenceCandidate;

/// Rank and filter evidence candidates.
///
/// Malformed input is a hard error: a candidate with empty text or an
/// acceptance rate outside [0, 1] (or non-finite) means the caller handed
/// us garbage. A candidate below `min_acceptance_rate` is merely low
/// quality and is silently dropped.
///
/// Survivors are sorted by acceptance rate descending, stable on insertion
/// order for ties, and truncated to `max_k`.
pub fn select_top(
    candidates: &[EvidenceCandidate],
    min_acceptance_rate: f64,
    max_k: usize,
) -> StanceResult<Vec<EvidenceCandidate>> {
    for (position, candidate) in candidates.iter().enumerate() {
        if candidate.text.trim().is_empty() {
            return Err(SelectorError::MissingText { position }.into());
        }
        if !candidate.acceptance_rate.is_finite()
            || !(0.0..=1.0).contains(&candidate.acceptance_rate)
        {
            return Err(SelectorError::InvalidRate {
                position,
                value: candidate.acceptance_rate,
            }
            .into());
        }
    }

    let mut survivors: Vec<EvidenceCandidate> = candidates
        .iter()
        .filter(|c| c.acceptance_rate >= min_acceptance_rate)
        .cloned()
        .collect();

    // Stable sort: ties keep insertion order.
    survivors.sort_by(|a, b| {
        b.acceptance_rate
            .partial_cmp(&a.acceptance_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    survivors.truncate(max_k);
    Ok(survivors)
}
