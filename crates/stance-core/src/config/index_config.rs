use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// On-disk layout and persistence cadence for the similarity indices and
/// the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding every index artifact.
    pub data_dir: PathBuf,
    /// Embedding cache is flushed every this many insertions.
    pub cache_persist_interval: usize,
    /// In-memory hot-tier capacity of the embedding cache.
    pub cache_hot_capacity: u64,
}

impl IndexConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_persist_interval: constants::DEFAULT_CACHE_PERSIST_INTERVAL,
            cache_hot_capacity: 4096,
        }
    }

    pub fn keyword_index_path(&self) -> PathBuf {
        self.data_dir.join("keyword.idx")
    }

    pub fn viewpoint_index_path(&self) -> PathBuf {
        self.data_dir.join("viewpoint.idx")
    }

    pub fn viewpoint_id_map_path(&self) -> PathBuf {
        self.data_dir.join("viewpoint.ids.json")
    }

    pub fn cache_blob_path(&self) -> PathBuf {
        self.data_dir.join("embed_cache.bin")
    }

    pub fn cache_meta_path(&self) -> PathBuf {
        self.data_dir.join("embed_cache.meta.json")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
