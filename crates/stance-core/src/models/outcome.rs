//! The tagged result union returned by the retrieval pipeline, plus the
//! observability trace of gates and tiers taken.

use serde::{Deserialize, Serialize};

use super::{RankedEvidence, Theme};

/// One gate or fallback tier the pipeline actually passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStep {
    ThemeGate,
    KeywordGate,
    ViewpointGate,
    StoreTier,
    CrawlerTier,
    GeneratorTier,
    IdRepair,
}

impl TraceStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStep::ThemeGate => "theme_gate",
            TraceStep::KeywordGate => "keyword_gate",
            TraceStep::ViewpointGate => "viewpoint_gate",
            TraceStep::StoreTier => "store_tier",
            TraceStep::CrawlerTier => "crawler_tier",
            TraceStep::GeneratorTier => "generator_tier",
            TraceStep::IdRepair => "id_repair",
        }
    }
}

/// Ordered, de-duplicated retrieval trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace(Vec<TraceStep>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step unless it is already present.
    pub fn push(&mut self, step: TraceStep) {
        if !self.0.contains(&step) {
            self.0.push(step);
        }
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.0
    }
}

/// The result of one `process()` call. One variant per retrieval path, each
/// carrying exactly the fields that path produces, so call sites handle
/// every case explicitly.
///
/// The serialized `status` tags (`crawler_refresh`, `generator_fallback`)
/// are named for the collaborator role that produced the evidence, not for
/// any particular backing service. Swapping in a different crawler or
/// generator implementation leaves the wire format unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    /// An existing viewpoint matched and its stored evidence cleared the
    /// quality filter.
    ExactMatch {
        theme: Theme,
        keyword: String,
        viewpoint_id: i64,
        evidence: Vec<RankedEvidence>,
        trace: Trace,
    },
    /// An existing viewpoint matched but its stored evidence was empty or
    /// stale; the crawler tier supplied an ephemeral refresh. Never
    /// persisted.
    CrawlerRefresh {
        theme: Theme,
        keyword: String,
        viewpoint_id: i64,
        evidence: Vec<RankedEvidence>,
        persisted: bool,
        trace: Trace,
    },
    /// The keyword gate passed but no viewpoint was similar enough; a new
    /// viewpoint was filed under the matched existing keyword.
    NewViewpointExistingKeyword {
        theme: Theme,
        keyword: String,
        viewpoint_id: i64,
        evidence: Vec<RankedEvidence>,
        persisted: bool,
        trace: Trace,
    },
    /// Theme or keyword gate failed; a brand-new viewpoint was created.
    CompletelyNew {
        theme: Theme,
        keyword: String,
        viewpoint_id: i64,
        evidence: Vec<RankedEvidence>,
        persisted: bool,
        trace: Trace,
    },
    /// The generator tier produced the evidence. Degraded answers are
    /// recorded as degraded: always persisted when a viewpoint exists,
    /// below-threshold items flagged `low_confidence`.
    GeneratorFallback {
        theme: Theme,
        keyword: String,
        viewpoint_id: Option<i64>,
        evidence: Vec<RankedEvidence>,
        persisted: bool,
        trace: Trace,
    },
    /// Every degrade step failed.
    #[serde(rename = "error")]
    Failed {
        theme: Option<Theme>,
        keyword: Option<String>,
        reason: String,
        trace: Trace,
    },
}

impl RetrievalOutcome {
    /// The wire status tag for this outcome.
    pub fn status(&self) -> &'static str {
        match self {
            RetrievalOutcome::ExactMatch { .. } => "exact_match",
            RetrievalOutcome::CrawlerRefresh { .. } => "crawler_refresh",
            RetrievalOutcome::NewViewpointExistingKeyword { .. } => {
                "new_viewpoint_existing_keyword"
            }
            RetrievalOutcome::CompletelyNew { .. } => "completely_new",
            RetrievalOutcome::GeneratorFallback { .. } => "generator_fallback",
            RetrievalOutcome::Failed { .. } => "error",
        }
    }

    /// The ranked evidence list, empty for failures.
    pub fn evidence(&self) -> &[RankedEvidence] {
        match self {
            RetrievalOutcome::ExactMatch { evidence, .. }
            | RetrievalOutcome::CrawlerRefresh { evidence, .. }
            | RetrievalOutcome::NewViewpointExistingKeyword { evidence, .. }
            | RetrievalOutcome::CompletelyNew { evidence, .. }
            | RetrievalOutcome::GeneratorFallback { evidence, .. } => evidence,
            RetrievalOutcome::Failed { .. } => &[],
        }
    }

    pub fn trace(&self) -> &Trace {
        match self {
            RetrievalOutcome::ExactMatch { trace, .. }
            | RetrievalOutcome::CrawlerRefresh { trace, .. }
            | RetrievalOutcome::NewViewpointExistingKeyword { trace, .. }
            | RetrievalOutcome::CompletelyNew { trace, .. }
            | RetrievalOutcome::GeneratorFallback { trace, .. }
            | RetrievalOutcome::Failed { trace, .. } => trace,
        }
    }
}
