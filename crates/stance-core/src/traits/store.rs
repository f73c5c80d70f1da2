use crate::errors::StanceResult;
use crate::models::{Evidence, NewEvidence, ScoreUpdateRecord, Theme, Viewpoint};

/// The relational knowledge base: viewpoints, evidence, feedback log.
///
/// The store is the source of truth the similarity indices are rebuilt
/// from. Single-writer model: implementations need not support concurrent
/// writers.
pub trait ViewpointStore: Send + Sync {
    // --- Viewpoints (append-only) ---

    /// Insert a viewpoint and return its assigned id.
    fn insert_viewpoint(&self, text: &str, theme: Theme, keywords: &str) -> StanceResult<i64>;
    fn viewpoint(&self, id: i64) -> StanceResult<Option<Viewpoint>>;
    /// Every viewpoint in ascending-id order. Rebuild source for the
    /// similarity indices; the order is load-bearing.
    fn viewpoints_ascending(&self) -> StanceResult<Vec<Viewpoint>>;
    fn viewpoint_count(&self) -> StanceResult<usize>;
    /// Number of viewpoints filed under the given theme.
    fn theme_count(&self, theme: Theme) -> StanceResult<usize>;
    /// The viewpoint at the given zero-based position in ascending-id
    /// order. Used to resolve keyword-index rows, which have no ID map of
    /// their own and rely on row-position parity with this ordering.
    fn viewpoint_at_position(&self, position: usize) -> StanceResult<Option<Viewpoint>>;
    /// First viewpoint whose keyword field contains the given fragment.
    fn find_by_keyword_fragment(&self, fragment: &str) -> StanceResult<Option<Viewpoint>>;
    fn most_recent_viewpoint(&self) -> StanceResult<Option<Viewpoint>>;

    // --- Evidence (append-only rows, mutable score) ---

    /// Append evidence rows for a viewpoint. Existing rows are never
    /// replaced. Returns the number of rows written.
    fn insert_evidence(&self, viewpoint_id: i64, items: &[NewEvidence]) -> StanceResult<usize>;
    fn evidence_for(&self, viewpoint_id: i64) -> StanceResult<Vec<Evidence>>;

    // --- Feedback ---

    /// Apply a feedback event: update the evidence score and append the
    /// audit record in one transaction.
    fn record_feedback(
        &self,
        evidence_id: i64,
        new_score: f64,
        usage_status: &str,
        reward: f64,
    ) -> StanceResult<ScoreUpdateRecord>;
}
