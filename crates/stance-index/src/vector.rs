//! Vector math for the flat indices. Cosine similarity is computed as an
//! inner product, so every stored vector must be unit-norm.

use stance_core::constants::NORM_TOLERANCE;
use stance_core::errors::{IndexError, StanceResult};

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Return a unit-norm copy. A zero-norm vector cannot be normalized and is
/// rejected rather than stored.
pub fn normalized(v: &[f32]) -> StanceResult<Vec<f32>> {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(IndexError::DegenerateVector.into());
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// Whether a vector satisfies the unit-norm invariant within tolerance.
pub fn is_unit_norm(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= NORM_TOLERANCE
}
