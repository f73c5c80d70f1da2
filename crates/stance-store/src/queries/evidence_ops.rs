//! Evidence reads and batch appends.

use chrono::Utc;
use rusqlite::{params, Connection};

use stance_core::errors::StanceResult;
use stance_core::models::{Evidence, EvidenceSource, NewEvidence};

use crate::to_store_err;

/// Append evidence rows for a viewpoint inside one transaction.
/// Existing rows are never touched: the evidence set only grows.
pub fn insert_batch(
    conn: &Connection,
    viewpoint_id: i64,
    items: &[NewEvidence],
) -> StanceResult<usize> {
    if items.is_empty() {
        return Ok(0);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_store_err(format!("insert_batch begin: {e}")))?;

    let now = Utc::now().to_rfc3339();
    for item in items {
        tx.execute(
            "INSERT INTO evidence (viewpoint_id, evidence, acceptance_rate, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                viewpoint_id,
                item.text,
                item.acceptance_rate,
                item.source.as_str(),
                now
            ],
        )
        .map_err(|e| to_store_err(e.to_string()))?;
    }

    tx.commit()
        .map_err(|e| to_store_err(format!("insert_batch commit: {e}")))?;
    Ok(items.len())
}

pub fn for_viewpoint(conn: &Connection, viewpoint_id: i64) -> StanceResult<Vec<Evidence>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, viewpoint_id, evidence, acceptance_rate, source, created_at
             FROM evidence WHERE viewpoint_id = ?1 ORDER BY id ASC",
        )
        .map_err(|e| to_store_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![viewpoint_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|e| to_store_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (id, viewpoint_id, text, acceptance_rate, source, created_at) =
            row.map_err(|e| to_store_err(e.to_string()))?;
        out.push(Evidence {
            id,
            viewpoint_id,
            text,
            acceptance_rate,
            source: EvidenceSource::parse(&source),
            created_at: super::parse_timestamp(&created_at)?,
        });
    }
    Ok(out)
}
