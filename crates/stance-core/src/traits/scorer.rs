use crate::errors::StanceResult;

/// A scored judgment of how well an evidence passage supports a viewpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreJudgment {
    /// Acceptance rate in [0, 1].
    pub value: f64,
    /// Present when the scorer could not parse its own output and fell
    /// back to 0.0; the note explains why, so a zero is never silent.
    pub note: Option<String>,
}

impl ScoreJudgment {
    pub fn clean(value: f64) -> Self {
        Self { value, note: None }
    }

    pub fn failed(note: impl Into<String>) -> Self {
        Self {
            value: 0.0,
            note: Some(note.into()),
        }
    }
}

/// Evidence scoring collaborator.
///
/// Parse failures inside the implementation must surface as
/// `ScoreJudgment::failed`, not as an `Err`: a per-item scoring failure is
/// soft and the pipeline keeps the item at score 0.0.
pub trait Scorer: Send + Sync {
    fn score(&self, viewpoint: &str, evidence: &str) -> StanceResult<ScoreJudgment>;
}
