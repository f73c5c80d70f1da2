//! Schema migrations, applied in order against `PRAGMA user_version`.

mod v001_core_tables;

use rusqlite::Connection;
use tracing::info;

use stance_core::errors::{StanceResult, StoreError};

const MIGRATIONS: &[(u32, fn(&Connection) -> StanceResult<()>)] = &[(1, v001_core_tables::migrate)];

/// Run every migration newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> StanceResult<()> {
    let current: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| crate::to_store_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| StoreError::MigrationFailed {
            version: *version,
            reason: e.to_string(),
        })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| crate::to_store_err(e.to_string()))?;
        info!(version, "applied migration");
    }
    Ok(())
}
