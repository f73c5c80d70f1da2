//! Exact-text-match embedding cache.
//!
//! Two tiers: a moka in-memory cache keyed by blake3 text hash in front
//! of a disk-backed row store. A cache hit requires an exact character
//! match; `"hello"` and `"hello "` are different entries.
//!
//! Persistence is batched: the blob and its JSON metadata sidecar are
//! flushed every `cache_persist_interval` insertions. A crash between
//! flushes loses only cached embeddings, which are recomputable.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stance_core::config::IndexConfig;
use stance_core::errors::{IndexError, StanceResult};
use stance_core::traits::Embedder;

use crate::persist;
use crate::vector;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    text: String,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    dimension: usize,
    entries: Vec<CacheEntry>,
}

pub struct EmbeddingCache {
    dimension: usize,
    /// Row-major unit-norm vectors, parallel to `entries`.
    rows: Vec<f32>,
    entries: Vec<CacheEntry>,
    /// blake3(text) hex → row position.
    by_hash: HashMap<String, usize>,
    /// Hot tier.
    hot: Cache<String, Vec<f32>>,
    /// Insertions since the last flush.
    pending: usize,
    persist_interval: usize,
    blob_path: PathBuf,
    meta_path: PathBuf,
}

fn text_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

impl EmbeddingCache {
    /// Open the cache for the currently detected embedding dimension.
    ///
    /// If the persisted cache was built at a different dimension it is
    /// discarded and the cache starts cold, never an error.
    pub fn open(config: &IndexConfig, current_dimension: usize) -> StanceResult<Self> {
        let blob_path = config.cache_blob_path();
        let meta_path = config.cache_meta_path();

        let mut cache = Self {
            dimension: current_dimension,
            rows: Vec::new(),
            entries: Vec::new(),
            by_hash: HashMap::new(),
            hot: Cache::new(config.cache_hot_capacity),
            pending: 0,
            persist_interval: config.cache_persist_interval.max(1),
            blob_path,
            meta_path,
        };

        let meta = match std::fs::read(&cache.meta_path) {
            Ok(bytes) => match serde_json::from_slice::<CacheMeta>(&bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(error = %e, "cache metadata unreadable, starting cold");
                    return Ok(cache);
                }
            },
            Err(_) => return Ok(cache),
        };

        if meta.dimension != current_dimension {
            info!(
                persisted = meta.dimension,
                current = current_dimension,
                "embedding dimension changed, discarding cache"
            );
            return Ok(cache);
        }

        let rows = match persist::load_matrix(&cache.blob_path)? {
            Some((dim, rows)) if dim == current_dimension => rows,
            _ => {
                warn!("cache blob missing or inconsistent, starting cold");
                return Ok(cache);
            }
        };

        if current_dimension != 0 && rows.len() / current_dimension != meta.entries.len() {
            warn!(
                rows = rows.len() / current_dimension,
                entries = meta.entries.len(),
                "cache blob and metadata disagree, starting cold"
            );
            return Ok(cache);
        }

        for (row, entry) in meta.entries.iter().enumerate() {
            cache.by_hash.insert(text_hash(&entry.text), row);
        }
        cache.rows = rows;
        cache.entries = meta.entries;
        debug!(entries = cache.entries.len(), "loaded embedding cache");
        Ok(cache)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the cached unit vector for an exact text match.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let hash = text_hash(text);
        if let Some(hit) = self.hot.get(&hash) {
            return Some(hit);
        }
        let row = *self.by_hash.get(&hash)?;
        let start = row * self.dimension;
        let vec = self.rows[start..start + self.dimension].to_vec();
        self.hot.insert(hash, vec.clone());
        Some(vec)
    }

    /// Return the cached vector for `text`, or embed it, normalize,
    /// append, and (every N insertions) persist.
    pub fn get_or_compute(&mut self, text: &str, embedder: &dyn Embedder) -> StanceResult<Vec<f32>> {
        if let Some(hit) = self.get(text) {
            debug!(len = text.len(), "embedding cache hit");
            return Ok(hit);
        }

        let raw = embedder.embed(text)?;
        if raw.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: raw.len(),
            }
            .into());
        }
        let unit = vector::normalized(&raw)?;

        let hash = text_hash(text);
        let row = self.entries.len();
        self.rows.extend_from_slice(&unit);
        self.entries.push(CacheEntry {
            text: text.to_string(),
            cached_at: Utc::now(),
        });
        self.by_hash.insert(hash.clone(), row);
        self.hot.insert(hash, unit.clone());

        self.pending += 1;
        if self.pending >= self.persist_interval {
            self.flush()?;
        }
        Ok(unit)
    }

    /// Persist the blob and metadata now, resetting the batch counter.
    pub fn flush(&mut self) -> StanceResult<()> {
        persist::atomic_write(
            &self.blob_path,
            &persist::encode_matrix(self.dimension, &self.rows),
        )?;
        let meta = CacheMeta {
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        let bytes = serde_json::to_vec(&meta).map_err(|e| IndexError::Io {
            path: self.meta_path.display().to_string(),
            message: e.to_string(),
        })?;
        persist::atomic_write(&self.meta_path, &bytes)?;
        self.pending = 0;
        debug!(entries = self.entries.len(), "flushed embedding cache");
        Ok(())
    }
}
