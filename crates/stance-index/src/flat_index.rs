//! Flat (brute-force, exact) cosine similarity index.
//!
//! Row-major matrix of unit-norm vectors plus an optional append-only ID
//! map. The viewpoint index carries the map; the keyword index has none
//! and relies on row-position parity with the viewpoint table's
//! ascending-id order.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};

use stance_core::errors::{IndexError, StanceResult};

use crate::persist;
use crate::vector;

pub struct SimilarityIndex {
    /// "keyword" or "viewpoint"; used only in logs.
    name: &'static str,
    dimension: usize,
    /// Row-major unit-norm vectors.
    rows: Vec<f32>,
    /// Row position → external viewpoint id. `None` for the keyword index.
    id_map: Option<Vec<i64>>,
    index_path: PathBuf,
    id_map_path: Option<PathBuf>,
}

impl SimilarityIndex {
    /// Load an index from disk, starting empty when files are missing or
    /// unreadable. Pass an ID-map path only for the viewpoint index.
    pub fn load(
        name: &'static str,
        index_path: PathBuf,
        id_map_path: Option<PathBuf>,
    ) -> StanceResult<Self> {
        let (dimension, rows) = persist::load_matrix(&index_path)?.unwrap_or((0, Vec::new()));

        let id_map = match &id_map_path {
            None => None,
            Some(path) => Some(match std::fs::read(path) {
                Ok(bytes) => serde_json::from_slice::<Vec<i64>>(&bytes).unwrap_or_else(|e| {
                    warn!(name, error = %e, "ID map unreadable, starting empty");
                    Vec::new()
                }),
                Err(_) => Vec::new(),
            }),
        };

        debug!(
            name,
            dimension,
            rows = if dimension == 0 { 0 } else { rows.len() / dimension },
            "loaded similarity index"
        );

        Ok(Self {
            name,
            dimension,
            rows,
            id_map,
            index_path,
            id_map_path,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row_count(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.rows.len() / self.dimension
        }
    }

    pub fn id_map_len(&self) -> usize {
        self.id_map.as_ref().map_or(0, Vec::len)
    }

    /// External id for a row, if this index carries a map and the row is
    /// mapped.
    pub fn id_at(&self, row: usize) -> Option<i64> {
        self.id_map.as_ref().and_then(|m| m.get(row).copied())
    }

    /// Normalize and append a vector; persist the blob (and ID map) before
    /// returning. Returns the new row position.
    pub fn add(&mut self, vector: &[f32], external_id: Option<i64>) -> StanceResult<usize> {
        if self.id_map.is_some() && external_id.is_none() {
            return Err(IndexError::Corrupt {
                details: format!("{} index requires an external id per row", self.name),
            }
            .into());
        }

        let unit = vector::normalized(vector)?;
        if self.dimension == 0 && self.rows.is_empty() {
            self.dimension = unit.len();
        } else if unit.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: unit.len(),
            }
            .into());
        }

        let row = self.row_count();
        self.rows.extend_from_slice(&unit);
        if let (Some(map), Some(id)) = (self.id_map.as_mut(), external_id) {
            map.push(id);
        }
        self.persist()?;

        debug!(name = self.name, row, "added vector");
        Ok(row)
    }

    /// Top-k inner products, descending; ties broken by lower row index
    /// (earliest inserted wins). The query is normalized first.
    pub fn search(&self, query: &[f32], k: usize) -> StanceResult<Vec<(f32, usize)>> {
        if self.row_count() == 0 || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            }
            .into());
        }

        let unit = vector::normalized(query)?;
        let mut scored: Vec<(f32, usize)> = self
            .rows
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| (vector::dot(&unit, stored), row))
            .collect();

        scored.sort_unstable_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Replace the entire index contents and persist atomically. The old
    /// files are not overwritten until the new ones are fully written.
    /// Vectors must already be unit-norm and of equal length.
    pub fn replace_all(
        &mut self,
        dimension: usize,
        vectors: Vec<Vec<f32>>,
        ids: Option<Vec<i64>>,
    ) -> StanceResult<()> {
        let mut rows = Vec::with_capacity(vectors.len() * dimension);
        for v in &vectors {
            if v.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: v.len(),
                }
                .into());
            }
            rows.extend_from_slice(v);
        }

        self.dimension = dimension;
        self.rows = rows;
        if self.id_map.is_some() {
            self.id_map = Some(ids.unwrap_or_default());
        }
        self.persist()
    }

    /// Overwrite just the ID map (best-effort repair path) and persist it.
    pub fn replace_id_map(&mut self, ids: Vec<i64>) -> StanceResult<()> {
        if self.id_map.is_none() {
            return Ok(());
        }
        self.id_map = Some(ids);
        self.persist_id_map()
    }

    fn persist(&self) -> StanceResult<()> {
        persist::atomic_write(
            &self.index_path,
            &persist::encode_matrix(self.dimension, &self.rows),
        )?;
        self.persist_id_map()
    }

    fn persist_id_map(&self) -> StanceResult<()> {
        if let (Some(map), Some(path)) = (&self.id_map, &self.id_map_path) {
            let bytes = serde_json::to_vec(map).map_err(|e| IndexError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            persist::atomic_write(path, &bytes)?;
        }
        Ok(())
    }
}
