//! Per-concern query modules.

pub mod evidence_ops;
pub mod feedback_ops;
pub mod viewpoint_ops;

use chrono::{DateTime, Utc};

use stance_core::errors::StanceResult;

use crate::to_store_err;

/// Parse an RFC 3339 TEXT column.
pub(crate) fn parse_timestamp(raw: &str) -> StanceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| to_store_err(format!("bad timestamp {raw:?}: {e}")))
}
