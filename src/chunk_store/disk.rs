use super::{chunk_file_name, ChunkManifest, ChunkStore, LoadedChunks, MANIFEST_FILE_NAME};
use crate::error::StorageError;
use crate::fsio;
use crate::types::ObjectKey;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the storage root where new chunk sets are assembled
pub(crate) const STAGING_DIR: &str = ".staging";

/// One directory per object under `root`:
///
/// ```text
/// <root>/<key>/chunks.json
/// <root>/<key>/chunk_0.bin
/// <root>/<key>/chunk_1.bin ...
/// ```
///
/// A save assembles the new set under `<root>/.staging/<key>` and swaps it in,
/// so an object directory never mixes chunks from two writes.
#[derive(Debug, Clone)]
pub struct FsChunkStore {
    root: PathBuf,
    chunk_size: usize,
}

impl FsChunkStore {
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            chunk_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_dir(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn staging_dir(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(STAGING_DIR).join(key.as_str())
    }

    fn read_manifest(&self, key: &ObjectKey, dir: &Path) -> Result<ChunkManifest, StorageError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::not_found(key));
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        serde_json::from_slice(&raw).map_err(|e| StorageError::CorruptedContent {
            key: key.to_string(),
            reason: format!("unreadable chunk manifest: {}", e),
        })
    }
}

impl ChunkStore for FsChunkStore {
    fn save(
        &self,
        key: &ObjectKey,
        chunks: &[Vec<u8>],
        compressed: bool,
    ) -> Result<ChunkManifest, StorageError> {
        let staging = self.staging_dir(key);
        fsio::remove_dir_if_exists(&staging)?;
        fsio::ensure_dir(&staging)?;

        for (ordinal, chunk) in chunks.iter().enumerate() {
            fsio::write_synced(&staging.join(chunk_file_name(ordinal)), chunk)?;
        }

        let manifest = ChunkManifest {
            chunk_count: chunks.len(),
            chunk_size: self.chunk_size,
            written_at: chrono::Utc::now(),
            compressed: Some(compressed),
            total_bytes: chunks.iter().map(|c| c.len() as u64).sum(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fsio::write_synced(&staging.join(MANIFEST_FILE_NAME), &manifest_json)?;

        let target = self.object_dir(key);
        let replaced = fsio::remove_dir_if_exists(&target)?;
        fs::rename(&staging, &target).map_err(|e| StorageError::io(&target, e))?;

        debug!(
            key = %key,
            chunks = manifest.chunk_count,
            bytes = manifest.total_bytes,
            replaced,
            "Saved chunk set"
        );
        Ok(manifest)
    }

    fn load(&self, key: &ObjectKey) -> Result<LoadedChunks, StorageError> {
        let dir = self.object_dir(key);
        if !dir.is_dir() {
            return Err(StorageError::not_found(key));
        }
        let manifest = self.read_manifest(key, &dir)?;

        let mut bytes = Vec::with_capacity(manifest.total_bytes as usize);
        for ordinal in 0..manifest.chunk_count {
            let path = dir.join(chunk_file_name(ordinal));
            match fs::read(&path) {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(StorageError::MissingChunk {
                        key: key.clone(),
                        ordinal,
                    });
                }
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }

        Ok(LoadedChunks { bytes, manifest })
    }

    fn remove(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        fsio::remove_dir_if_exists(&self.object_dir(key))
    }

    fn disk_usage(&self, key: &ObjectKey) -> Result<u64, StorageError> {
        let dir = self.object_dir(key);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };
        let mut total = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let meta = entry.metadata().map_err(|e| StorageError::io(entry.path(), e))?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}
