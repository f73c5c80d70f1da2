//! v001: viewpoints, evidence, evidence_score_updates.

use rusqlite::Connection;

use stance_core::errors::StanceResult;

use crate::to_store_err;

pub fn migrate(conn: &Connection) -> StanceResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS viewpoints (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            viewpoint   TEXT NOT NULL,
            theme       TEXT NOT NULL,
            key_words   TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_viewpoints_theme ON viewpoints(theme);

        CREATE TABLE IF NOT EXISTS evidence (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            viewpoint_id    INTEGER NOT NULL,
            evidence        TEXT NOT NULL,
            acceptance_rate REAL NOT NULL,
            source          TEXT NOT NULL DEFAULT 'store',
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (viewpoint_id) REFERENCES viewpoints(id)
        );

        CREATE INDEX IF NOT EXISTS idx_evidence_viewpoint ON evidence(viewpoint_id);

        CREATE TABLE IF NOT EXISTS evidence_score_updates (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            evidence_id  INTEGER NOT NULL,
            old_score    REAL NOT NULL,
            new_score    REAL NOT NULL,
            usage_status TEXT NOT NULL DEFAULT '',
            reward       REAL NOT NULL DEFAULT 0.0,
            updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (evidence_id) REFERENCES evidence(id)
        );

        CREATE INDEX IF NOT EXISTS idx_score_updates_evidence
            ON evidence_score_updates(evidence_id);
        ",
    )
    .map_err(|e| to_store_err(e.to_string()))?;
    Ok(())
}
