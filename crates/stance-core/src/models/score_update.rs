//! Append-only feedback audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the feedback log. Created whenever an evidence score
/// changes; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdateRecord {
    pub id: i64,
    pub evidence_id: i64,
    pub old_score: f64,
    pub new_score: f64,
    /// Free-form usage context supplied with the feedback event.
    pub usage_status: String,
    pub reward: f64,
    pub updated_at: DateTime<Utc>,
}
