//! StoreSettings: constructor parameters of the memory manager.

use crate::cache::DEFAULT_CACHE_SIZE;
use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::compression::{DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL};
use crate::config::paths;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_storage_dir() -> PathBuf {
    paths::default_storage_dir()
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Root directory for the index file and per-object chunk directories
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Maximum number of notebooks kept decompressed in memory
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// zlib level, 0-9
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl StoreSettings {
    /// Default settings rooted at `storage_dir`
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ApiError::ConfigError(
                "storage_dir must not be empty".to_string(),
            ));
        }
        if self.cache_size == 0 {
            return Err(ApiError::ConfigError(
                "cache_size must be at least 1".to_string(),
            ));
        }
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ApiError::ConfigError(format!(
                "compression_level must be between 0 and {} (got {})",
                MAX_COMPRESSION_LEVEL, self.compression_level
            )));
        }
        if self.chunk_size == 0 {
            return Err(ApiError::ConfigError(
                "chunk_size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            cache_size: default_cache_size(),
            compression_level: default_compression_level(),
            chunk_size: default_chunk_size(),
        }
    }
}
