//! On-disk persistence for index blobs.
//!
//! Blob layout: `[dimension: u32 LE][row_count: u64 LE][f32 LE data]`.
//! Writes go to a temp file first and are renamed into place, so a reader
//! never observes a half-written blob and the old file survives a crash
//! mid-write.

use std::fs;
use std::path::Path;

use tracing::warn;

use stance_core::errors::{IndexError, StanceResult};

fn io_err(path: &Path, e: impl std::fmt::Display) -> IndexError {
    IndexError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Write bytes to `path` atomically (temp file + rename).
pub fn atomic_write(path: &Path, bytes: &[u8]) -> StanceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

pub fn f32s_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn bytes_to_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Serialize a flat matrix with its header.
pub fn encode_matrix(dimension: usize, rows: &[f32]) -> Vec<u8> {
    let row_count = if dimension == 0 {
        0
    } else {
        rows.len() / dimension
    };
    let mut out = Vec::with_capacity(12 + rows.len() * 4);
    out.extend_from_slice(&(dimension as u32).to_le_bytes());
    out.extend_from_slice(&(row_count as u64).to_le_bytes());
    out.extend_from_slice(&f32s_to_bytes(rows));
    out
}

/// Load a flat matrix from disk.
///
/// A missing file yields `None` (start empty). A corrupt file also yields
/// `None` after a warning: the store is the source of truth and the index
/// is rebuilt from it, so corruption is recoverable, not fatal.
pub fn load_matrix(path: &Path) -> StanceResult<Option<(usize, Vec<f32>)>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e).into()),
    };

    if bytes.len() < 12 {
        warn!(path = %path.display(), "index blob too short, discarding");
        return Ok(None);
    }
    let dimension = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let row_count = u64::from_le_bytes([
        bytes[4], bytes[5], bytes[6], bytes[7], bytes[8], bytes[9], bytes[10], bytes[11],
    ]) as usize;

    let expected = 12 + dimension * row_count * 4;
    if bytes.len() != expected {
        warn!(
            path = %path.display(),
            expected,
            actual = bytes.len(),
            "index blob length disagrees with header, discarding"
        );
        return Ok(None);
    }

    Ok(Some((dimension, bytes_to_f32s(&bytes[12..]))))
}
