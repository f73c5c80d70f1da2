//! Self-healing consistency manager for the index pair.
//!
//! The relational store is the source of truth. This manager detects two
//! kinds of desync and recovers from both without surfacing errors:
//!
//! - dimension drift (embedder changed between deployments): full rebuild
//!   of BOTH indices; row-position parity between them means rebuilding
//!   one alone corrupts the pairing;
//! - ID-map length drift: best-effort ID repair. This is deliberately a
//!   patch, not a fix; only a full rebuild restores a correct 1:1
//!   vector-to-id pairing, and search results are not authoritative right
//!   after an ID-repair-only recovery.

use serde::Serialize;
use tracing::{info, warn};

use stance_core::config::IndexConfig;
use stance_core::errors::{IndexError, StanceError, StanceResult};
use stance_core::models::Viewpoint;
use stance_core::traits::{Embedder, ViewpointStore};

use crate::cache::EmbeddingCache;
use crate::flat_index::SimilarityIndex;
use crate::vector;

/// Sentinel text embedded once per process to detect the live dimension.
const DIMENSION_PROBE: &str = "dimension probe";

/// What kind of recovery last ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// Store empty but index had rows: ID map cleared, rows kept.
    Cleared,
    /// Store smaller than the index: all store IDs adopted, trailing index
    /// rows left unmapped.
    Partial,
    /// Store larger than the index: map truncated to the row count; extra
    /// viewpoints stay unsearchable until the next rebuild or add.
    Truncated,
    /// Counts equal: store IDs adopted as the map.
    Adopted,
    /// Everything re-embedded from the store.
    FullRebuild,
}

/// Snapshot of index health for observability. Log-only; desync is always
/// auto-recovered and never surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct IndexHealth {
    pub dimension: usize,
    pub keyword_rows: usize,
    pub viewpoint_rows: usize,
    pub id_map_len: usize,
    pub cached_embeddings: usize,
    pub last_repair: Option<RepairKind>,
}

pub struct ConsistencyManager<'a> {
    store: &'a dyn ViewpointStore,
    embedder: &'a dyn Embedder,
    config: IndexConfig,
    keyword_index: SimilarityIndex,
    viewpoint_index: SimilarityIndex,
    cache: EmbeddingCache,
    /// Detected once per process start; rebuilds re-detect.
    dimension: usize,
    last_repair: Option<RepairKind>,
}

fn detect_dimension(embedder: &dyn Embedder) -> StanceResult<usize> {
    let probe = embedder.embed(DIMENSION_PROBE)?;
    if probe.is_empty() {
        return Err(StanceError::collaborator(
            "embedder",
            "sentinel embedding was empty",
        ));
    }
    Ok(probe.len())
}

/// The text a viewpoint's keyword row is embedded from. An empty keyword
/// field falls back to the viewpoint text so the row stays unit-norm.
fn keyword_basis(vp: &Viewpoint) -> &str {
    if vp.keywords.trim().is_empty() {
        &vp.text
    } else {
        &vp.keywords
    }
}

impl<'a> ConsistencyManager<'a> {
    /// Load both indices and the cache, then bring everything consistent:
    /// dimension drift triggers a dual rebuild, ID-map drift a best-effort
    /// repair.
    pub fn open(
        store: &'a dyn ViewpointStore,
        embedder: &'a dyn Embedder,
        config: IndexConfig,
    ) -> StanceResult<Self> {
        let dimension = detect_dimension(embedder)?;
        let cache = EmbeddingCache::open(&config, dimension)?;
        let keyword_index =
            SimilarityIndex::load("keyword", config.keyword_index_path(), None)?;
        let viewpoint_index = SimilarityIndex::load(
            "viewpoint",
            config.viewpoint_index_path(),
            Some(config.viewpoint_id_map_path()),
        )?;

        let mut manager = Self {
            store,
            embedder,
            config,
            keyword_index,
            viewpoint_index,
            cache,
            dimension,
            last_repair: None,
        };

        let kw_dim = manager.keyword_index.dimension();
        let vp_dim = manager.viewpoint_index.dimension();
        let stale_dimension =
            (kw_dim != 0 && kw_dim != dimension) || (vp_dim != 0 && vp_dim != dimension);
        let parity_broken =
            manager.keyword_index.row_count() != manager.viewpoint_index.row_count();

        if stale_dimension || parity_broken {
            warn!(
                stale_dimension,
                parity_broken, "indices stale on load, rebuilding both"
            );
            manager.rebuild_all()?;
        } else {
            manager.verify()?;
        }
        Ok(manager)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn keyword_index(&self) -> &SimilarityIndex {
        &self.keyword_index
    }

    pub fn viewpoint_index(&self) -> &SimilarityIndex {
        &self.viewpoint_index
    }

    /// Embed through the exact-match cache.
    pub fn embed(&mut self, text: &str) -> StanceResult<Vec<f32>> {
        self.cache.get_or_compute(text, self.embedder)
    }

    pub fn search_keywords(&self, query: &[f32], k: usize) -> StanceResult<Vec<(f32, usize)>> {
        self.keyword_index.search(query, k)
    }

    pub fn search_viewpoints(&self, query: &[f32], k: usize) -> StanceResult<Vec<(f32, usize)>> {
        self.viewpoint_index.search(query, k)
    }

    /// Viewpoint id mapped to an index row, if any.
    pub fn resolve_viewpoint_id(&self, row: usize) -> Option<i64> {
        self.viewpoint_index.id_at(row)
    }

    /// Check the ID-map invariant and repair if it is broken. Called on
    /// load and before searches. Returns the repair performed, if any.
    pub fn verify(&mut self) -> StanceResult<Option<RepairKind>> {
        let rows = self.viewpoint_index.row_count();
        let map_len = self.viewpoint_index.id_map_len();
        if map_len == rows {
            return Ok(None);
        }

        let store_ids: Vec<i64> = self
            .store
            .viewpoints_ascending()?
            .iter()
            .map(|vp| vp.id)
            .collect();
        let store_count = store_ids.len();

        let (kind, map) = if store_count == 0 && rows > 0 {
            (RepairKind::Cleared, Vec::new())
        } else if store_count < rows {
            (RepairKind::Partial, store_ids)
        } else if store_count > rows {
            (RepairKind::Truncated, store_ids[..rows].to_vec())
        } else {
            (RepairKind::Adopted, store_ids)
        };

        // Idempotence guard: if the best-effort map is what we already
        // have (the Partial case can never equalize lengths), don't churn
        // the file or the log.
        if self.viewpoint_index.id_map_len() == map.len()
            && (0..map.len()).all(|i| self.viewpoint_index.id_at(i) == Some(map[i]))
        {
            return Ok(None);
        }

        warn!(
            ?kind,
            index_rows = rows,
            map_len,
            store_count,
            "ID map desync, applying best-effort repair (not authoritative until rebuild)"
        );
        self.viewpoint_index.replace_id_map(map)?;
        self.last_repair = Some(kind);
        Ok(Some(kind))
    }

    /// Incremental add for a freshly created viewpoint.
    ///
    /// Embeds the viewpoint and keyword texts; if either disagrees with
    /// the live dimension the incremental add is abandoned in favor of a
    /// full rebuild rather than inserting a malformed row. On success all
    /// four artifacts (two index blobs, ID map, cache) are persisted.
    pub fn add_viewpoint(&mut self, vp: &Viewpoint) -> StanceResult<()> {
        let embedded = self
            .embed(&vp.text)
            .and_then(|vp_vec| Ok((vp_vec, self.embed(keyword_basis(vp))?)));

        let (vp_vec, kw_vec) = match embedded {
            Ok(pair) => pair,
            Err(StanceError::Index(IndexError::DimensionMismatch { expected, actual })) => {
                warn!(
                    expected,
                    actual, "dimension disagreement on incremental add, rebuilding instead"
                );
                return self.rebuild_all();
            }
            Err(e) => return Err(e),
        };

        match self.keyword_index.add(&kw_vec, None) {
            Err(StanceError::Index(IndexError::DimensionMismatch { .. })) => {
                return self.rebuild_all();
            }
            other => other?,
        };
        match self.viewpoint_index.add(&vp_vec, Some(vp.id)) {
            Err(StanceError::Index(IndexError::DimensionMismatch { .. })) => {
                return self.rebuild_all();
            }
            other => other?,
        };
        self.cache.flush()?;

        info!(viewpoint_id = vp.id, "indexed new viewpoint");
        Ok(())
    }

    /// Re-embed everything from the store, replacing both indices and the
    /// ID map atomically. Idempotent: rebuilding twice with no intervening
    /// writes yields an identical ID map and cosine-equal vectors.
    pub fn rebuild_all(&mut self) -> StanceResult<()> {
        // Rebuilds are how dimension drift is healed, so re-detect.
        let dimension = detect_dimension(self.embedder)?;
        if dimension != self.dimension {
            info!(
                old = self.dimension,
                new = dimension,
                "embedding dimension changed"
            );
            self.dimension = dimension;
            self.cache = EmbeddingCache::open(&self.config, dimension)?;
        }

        let viewpoints = self.store.viewpoints_ascending()?;
        let mut kw_vectors = Vec::with_capacity(viewpoints.len());
        let mut vp_vectors = Vec::with_capacity(viewpoints.len());
        let mut ids = Vec::with_capacity(viewpoints.len());

        for vp in &viewpoints {
            vp_vectors.push(self.embed_checked(&vp.text)?);
            kw_vectors.push(self.embed_checked(keyword_basis(vp))?);
            ids.push(vp.id);
        }

        self.keyword_index.replace_all(dimension, kw_vectors, None)?;
        self.viewpoint_index
            .replace_all(dimension, vp_vectors, Some(ids))?;
        self.cache.flush()?;
        self.last_repair = Some(RepairKind::FullRebuild);

        info!(
            rows = viewpoints.len(),
            dimension, "rebuilt both similarity indices from the store"
        );
        Ok(())
    }

    /// Embed directly (bypassing the cache: rebuilds recompute from
    /// scratch) and insist on the detected dimension.
    fn embed_checked(&self, text: &str) -> StanceResult<Vec<f32>> {
        let raw = self.embedder.embed(text)?;
        if raw.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: raw.len(),
            }
            .into());
        }
        vector::normalized(&raw)
    }

    /// Persist anything pending (the embedding cache batches writes).
    pub fn flush(&mut self) -> StanceResult<()> {
        self.cache.flush()
    }

    pub fn health(&self) -> IndexHealth {
        IndexHealth {
            dimension: self.dimension,
            keyword_rows: self.keyword_index.row_count(),
            viewpoint_rows: self.viewpoint_index.row_count(),
            id_map_len: self.viewpoint_index.id_map_len(),
            cached_embeddings: self.cache.len(),
            last_repair: self.last_repair,
        }
    }
}
