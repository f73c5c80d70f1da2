//! Viewpoint reads and the single (append-only) write.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use stance_core::errors::StanceResult;
use stance_core::models::{Theme, Viewpoint};

use crate::to_store_err;

fn map_viewpoint(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn build_viewpoint(raw: (i64, String, String, String, String)) -> StanceResult<Viewpoint> {
    let (id, text, theme, keywords, created_at) = raw;
    Ok(Viewpoint {
        id,
        text,
        theme: Theme::parse(&theme),
        keywords,
        created_at: super::parse_timestamp(&created_at)?,
    })
}

const SELECT_COLS: &str = "id, viewpoint, theme, key_words, created_at";

/// Insert a viewpoint and return its assigned (monotonic) id.
pub fn insert_viewpoint(
    conn: &Connection,
    text: &str,
    theme: Theme,
    keywords: &str,
) -> StanceResult<i64> {
    conn.execute(
        "INSERT INTO viewpoints (viewpoint, theme, key_words, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![text, theme.as_str(), keywords, Utc::now().to_rfc3339()],
    )
    .map_err(|e| to_store_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_viewpoint(conn: &Connection, id: i64) -> StanceResult<Option<Viewpoint>> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM viewpoints WHERE id = ?1"),
            params![id],
            map_viewpoint,
        )
        .optional()
        .map_err(|e| to_store_err(e.to_string()))?;
    raw.map(build_viewpoint).transpose()
}

/// Every viewpoint in ascending-id order. The order is load-bearing: index
/// row positions are paired with it.
pub fn all_ascending(conn: &Connection) -> StanceResult<Vec<Viewpoint>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLS} FROM viewpoints ORDER BY id ASC"
        ))
        .map_err(|e| to_store_err(e.to_string()))?;
    let rows = stmt
        .query_map([], map_viewpoint)
        .map_err(|e| to_store_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(build_viewpoint(
            row.map_err(|e| to_store_err(e.to_string()))?,
        )?);
    }
    Ok(out)
}

pub fn count(conn: &Connection) -> StanceResult<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM viewpoints", [], |row| row.get(0))
        .map_err(|e| to_store_err(e.to_string()))?;
    Ok(n as usize)
}

pub fn count_by_theme(conn: &Connection, theme: Theme) -> StanceResult<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM viewpoints WHERE theme = ?1",
            params![theme.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| to_store_err(e.to_string()))?;
    Ok(n as usize)
}

/// The viewpoint at a zero-based position in ascending-id order.
pub fn at_position(conn: &Connection, position: usize) -> StanceResult<Option<Viewpoint>> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM viewpoints ORDER BY id ASC LIMIT 1 OFFSET ?1"),
            params![position as i64],
            map_viewpoint,
        )
        .optional()
        .map_err(|e| to_store_err(e.to_string()))?;
    raw.map(build_viewpoint).transpose()
}

/// First viewpoint whose keyword field contains the fragment.
pub fn find_by_keyword_fragment(
    conn: &Connection,
    fragment: &str,
) -> StanceResult<Option<Viewpoint>> {
    let pattern = format!(
        "%{}%",
        fragment.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
    );
    let raw = conn
        .query_row(
            &format!(
                "SELECT {SELECT_COLS} FROM viewpoints
                 WHERE key_words LIKE ?1 ESCAPE '\\'
                 ORDER BY id ASC LIMIT 1"
            ),
            params![pattern],
            map_viewpoint,
        )
        .optional()
        .map_err(|e| to_store_err(e.to_string()))?;
    raw.map(build_viewpoint).transpose()
}

pub fn most_recent(conn: &Connection) -> StanceResult<Option<Viewpoint>> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM viewpoints ORDER BY id DESC LIMIT 1"),
            [],
            map_viewpoint,
        )
        .optional()
        .map_err(|e| to_store_err(e.to_string()))?;
    raw.map(build_viewpoint).transpose()
}
