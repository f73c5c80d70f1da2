//! Evidence passages and the candidate/ranked forms they pass through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an evidence passage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Already present in the relational store.
    Store,
    /// Retrieved from the external text-corpus crawler.
    Crawler,
    /// Synthesized by the generator collaborator.
    Generated,
}

impl EvidenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSource::Store => "store",
            EvidenceSource::Crawler => "crawler",
            EvidenceSource::Generated => "generated",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "crawler" => EvidenceSource::Crawler,
            "generated" => EvidenceSource::Generated,
            _ => EvidenceSource::Store,
        }
    }
}

/// A stored evidence row. `acceptance_rate` is the only mutable field and
/// changes only through a feedback event, which also appends a
/// [`super::ScoreUpdateRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: i64,
    pub viewpoint_id: i64,
    pub text: String,
    pub acceptance_rate: f64,
    pub source: EvidenceSource,
    pub created_at: DateTime<Utc>,
}

/// A not-yet-stored evidence row, produced by a fallback tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvidence {
    pub text: String,
    pub acceptance_rate: f64,
    pub source: EvidenceSource,
}

/// An evidence candidate flowing through scoring and selection.
///
/// Candidates from the crawler and generator tiers carry a scorer note when
/// scoring soft-failed, and a `low_confidence` flag when the generator tier
/// kept them below the acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCandidate {
    pub text: String,
    pub acceptance_rate: f64,
    pub source: EvidenceSource,
    /// Attached by the scorer on per-item scoring failure (score 0.0).
    pub note: Option<String>,
    pub low_confidence: bool,
}

impl EvidenceCandidate {
    pub fn new(text: impl Into<String>, acceptance_rate: f64, source: EvidenceSource) -> Self {
        Self {
            text: text.into(),
            acceptance_rate,
            source,
            note: None,
            low_confidence: false,
        }
    }

    pub fn from_stored(evidence: &Evidence) -> Self {
        Self {
            text: evidence.text.clone(),
            acceptance_rate: evidence.acceptance_rate,
            source: evidence.source,
            note: None,
            low_confidence: false,
        }
    }
}

/// One entry of the ranked evidence list returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEvidence {
    /// 1-based rank.
    pub rank: usize,
    pub text: String,
    pub acceptance_rate: f64,
    pub source: EvidenceSource,
    pub low_confidence: bool,
}

impl RankedEvidence {
    /// Number candidates into their final ranked form, preserving order.
    pub fn rank_all(candidates: &[EvidenceCandidate]) -> Vec<RankedEvidence> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| RankedEvidence {
                rank: i + 1,
                text: c.text.clone(),
                acceptance_rate: c.acceptance_rate,
                source: c.source,
                low_confidence: c.low_confidence,
            })
            .collect()
    }
}
