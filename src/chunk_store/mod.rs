//! Chunk Store
//!
//! Durable storage for the chunk set of each object. The orchestrator only talks
//! to the [`ChunkStore`] trait; [`FsChunkStore`] is the on-disk implementation.

mod disk;

pub use disk::FsChunkStore;
pub(crate) use disk::STAGING_DIR;

use crate::error::StorageError;
use crate::types::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest file name inside each object directory
pub const MANIFEST_FILE_NAME: &str = "chunks.json";

/// File name of the `ordinal`th chunk
pub fn chunk_file_name(ordinal: usize) -> String {
    format!("chunk_{}.bin", ordinal)
}

/// Contents of `chunks.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub written_at: DateTime<Utc>,
    /// Absent in manifests written before the flag was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed: Option<bool>,
    #[serde(default)]
    pub total_bytes: u64,
}

/// A reassembled chunk set
#[derive(Debug, Clone)]
pub struct LoadedChunks {
    pub bytes: Vec<u8>,
    pub manifest: ChunkManifest,
}

/// Chunk persistence interface
pub trait ChunkStore: Send {
    /// Replace the chunk set for `key` with `chunks`.
    fn save(
        &self,
        key: &ObjectKey,
        chunks: &[Vec<u8>],
        compressed: bool,
    ) -> Result<ChunkManifest, StorageError>;

    /// Read and concatenate the chunk set for `key`.
    fn load(&self, key: &ObjectKey) -> Result<LoadedChunks, StorageError>;

    /// Remove the chunk set for `key`. Returns `false` if there was none.
    fn remove(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Bytes occupied by the chunk files of `key` (0 if absent).
    fn disk_usage(&self, key: &ObjectKey) -> Result<u64, StorageError>;
}
