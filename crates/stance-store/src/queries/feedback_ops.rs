//! Feedback events: score update + audit record, atomically.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use stance_core::errors::{StanceResult, StoreError};
use stance_core::models::ScoreUpdateRecord;

use crate::to_store_err;

/// Apply a feedback event to an evidence row.
///
/// Updates `acceptance_rate` and appends the `evidence_score_updates` audit
/// row in one transaction, so a score change is never unexplained.
pub fn record_feedback(
    conn: &Connection,
    evidence_id: i64,
    new_score: f64,
    usage_status: &str,
    reward: f64,
) -> StanceResult<ScoreUpdateRecord> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_store_err(format!("record_feedback begin: {e}")))?;

    let old_score: f64 = tx
        .query_row(
            "SELECT acceptance_rate FROM evidence WHERE id = ?1",
            params![evidence_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_store_err(e.to_string()))?
        .ok_or(StoreError::NotFound {
            entity: "evidence",
            id: evidence_id,
        })?;

    tx.execute(
        "UPDATE evidence SET acceptance_rate = ?1 WHERE id = ?2",
        params![new_score, evidence_id],
    )
    .map_err(|e| to_store_err(e.to_string()))?;

    let updated_at = Utc::now();
    tx.execute(
        "INSERT INTO evidence_score_updates
            (evidence_id, old_score, new_score, usage_status, reward, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            evidence_id,
            old_score,
            new_score,
            usage_status,
            reward,
            updated_at.to_rfc3339()
        ],
    )
    .map_err(|e| to_store_err(e.to_string()))?;
    let record_id = tx.last_insert_rowid();

    tx.commit()
        .map_err(|e| to_store_err(format!("record_feedback commit: {e}")))?;

    debug!(evidence_id, old_score, new_score, "recorded feedback");

    Ok(ScoreUpdateRecord {
        id: record_id,
        evidence_id,
        old_score,
        new_score,
        usage_status: usage_status.to_string(),
        reward,
        updated_at,
    })
}
