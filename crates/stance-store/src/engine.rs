//! EvidenceStore: owns the SQLite connection, runs migrations on open,
//! implements `ViewpointStore`.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use stance_core::errors::StanceResult;
use stance_core::models::{Evidence, NewEvidence, ScoreUpdateRecord, Theme, Viewpoint};
use stance_core::traits::ViewpointStore;

use crate::migrations;
use crate::queries::{evidence_ops, feedback_ops, viewpoint_ops};
use crate::to_store_err;

/// The relational knowledge base. Single-writer model: one connection
/// behind a mutex; writers in other processes are not coordinated here.
pub struct EvidenceStore {
    conn: Mutex<Connection>,
}

impl EvidenceStore {
    /// Open (or create) a file-backed store and run migrations.
    pub fn open(path: &Path) -> StanceResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_store_err(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(true)?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StanceResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_store_err(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(false)?;
        Ok(store)
    }

    fn initialize(&self, file_backed: bool) -> StanceResult<()> {
        self.with_conn(|conn| {
            if file_backed {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| to_store_err(e.to_string()))?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(|e| to_store_err(e.to_string()))?;
            migrations::run_migrations(conn)
        })
    }

    /// Run a closure against the connection.
    fn with_conn<F, T>(&self, f: F) -> StanceResult<T>
    where
        F: FnOnce(&Connection) -> StanceResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| to_store_err("connection mutex poisoned"))?;
        f(&conn)
    }
}

impl ViewpointStore for EvidenceStore {
    fn insert_viewpoint(&self, text: &str, theme: Theme, keywords: &str) -> StanceResult<i64> {
        self.with_conn(|conn| viewpoint_ops::insert_viewpoint(conn, text, theme, keywords))
    }

    fn viewpoint(&self, id: i64) -> StanceResult<Option<Viewpoint>> {
        self.with_conn(|conn| viewpoint_ops::get_viewpoint(conn, id))
    }

    fn viewpoints_ascending(&self) -> StanceResult<Vec<Viewpoint>> {
        self.with_conn(viewpoint_ops::all_ascending)
    }

    fn viewpoint_count(&self) -> StanceResult<usize> {
        self.with_conn(viewpoint_ops::count)
    }

    fn theme_count(&self, theme: Theme) -> StanceResult<usize> {
        self.with_conn(|conn| viewpoint_ops::count_by_theme(conn, theme))
    }

    fn viewpoint_at_position(&self, position: usize) -> StanceResult<Option<Viewpoint>> {
        self.with_conn(|conn| viewpoint_ops::at_position(conn, position))
    }

    fn find_by_keyword_fragment(&self, fragment: &str) -> StanceResult<Option<Viewpoint>> {
        self.with_conn(|conn| viewpoint_ops::find_by_keyword_fragment(conn, fragment))
    }

    fn most_recent_viewpoint(&self) -> StanceResult<Option<Viewpoint>> {
        self.with_conn(viewpoint_ops::most_recent)
    }

    fn insert_evidence(&self, viewpoint_id: i64, items: &[NewEvidence]) -> StanceResult<usize> {
        self.with_conn(|conn| evidence_ops::insert_batch(conn, viewpoint_id, items))
    }

    fn evidence_for(&self, viewpoint_id: i64) -> StanceResult<Vec<Evidence>> {
        self.with_conn(|conn| evidence_ops::for_viewpoint(conn, viewpoint_id))
    }

    fn record_feedback(
        &self,
        evidence_id: i64,
        new_score: f64,
        usage_status: &str,
        reward: f64,
    ) -> StanceResult<ScoreUpdateRecord> {
        self.with_conn(|conn| {
            feedback_ops::record_feedback(conn, evidence_id, new_score, usage_status, reward)
        })
    }
}
