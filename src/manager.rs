//! Memory Manager
//!
//! Orchestrates hashing, compression, chunk persistence, the metadata index and
//! the payload cache for notebook objects. One instance owns one storage root;
//! construct it once and hand it to whatever needs notebook storage.
//!
//! Every operation here performs blocking file I/O. Async hosts should go
//! through [`crate::shared::SharedMemoryManager`].

use crate::cache::PayloadCache;
use crate::chunk_store::{ChunkManifest, ChunkStore, FsChunkStore, STAGING_DIR};
use crate::chunking;
use crate::compression::Compressor;
use crate::config::StoreSettings;
use crate::error::{ApiError, StorageError};
use crate::fsio;
use crate::hasher::{ContentHasher, Fingerprint};
use crate::index::{DuplicateGroups, MetadataIndex, MetadataRecord, RecordFilter};
use crate::types::{ContentPayload, ObjectKey, INDEX_FILE_NAME};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Caller-supplied metadata fields
pub type Fields = Map<String, Value>;

/// Snapshot of store usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub objects: usize,
    pub cached: usize,
    pub cache_capacity: usize,
    /// Sum of canonical payload sizes
    pub total_size: u64,
    /// Bytes occupied by chunk directories
    pub disk_bytes: u64,
    pub duplicate_groups: usize,
    /// Objects whose content is also stored under another key
    pub duplicate_objects: usize,
    pub degraded_hashes: usize,
    pub compression_available: bool,
}

/// Notebook storage engine
pub struct MemoryManager {
    settings: StoreSettings,
    index: MetadataIndex,
    chunks: Box<dyn ChunkStore>,
    cache: PayloadCache,
    compressor: Compressor,
    hasher: ContentHasher,
}

impl MemoryManager {
    /// Open (or create) the store rooted at `settings.storage_dir`.
    pub fn open(settings: StoreSettings) -> Result<Self, ApiError> {
        let chunks = FsChunkStore::new(&settings.storage_dir, settings.chunk_size);
        Self::with_chunk_store(settings, Box::new(chunks))
    }

    /// Open the store with a custom chunk backend.
    pub fn with_chunk_store(
        settings: StoreSettings,
        chunks: Box<dyn ChunkStore>,
    ) -> Result<Self, ApiError> {
        settings.validate()?;
        fsio::ensure_dir(&settings.storage_dir)?;

        let staging = settings.storage_dir.join(STAGING_DIR);
        match fsio::remove_dir_if_exists(&staging) {
            Ok(true) => info!(path = %staging.display(), "Removed leftover staging directory"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not clear staging directory"),
        }

        let index = MetadataIndex::load(settings.storage_dir.join(INDEX_FILE_NAME))?;
        info!(
            storage_dir = %settings.storage_dir.display(),
            objects = index.len(),
            cache_size = settings.cache_size,
            compression_level = settings.compression_level,
            chunk_size = settings.chunk_size,
            "Opened notebook store"
        );

        Ok(Self {
            cache: PayloadCache::new(settings.cache_size),
            compressor: Compressor::new(settings.compression_level),
            hasher: ContentHasher::new(),
            index,
            chunks,
            settings,
        })
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn storage_dir(&self) -> &Path {
        &self.settings.storage_dir
    }

    /// Store `content` under `key`.
    ///
    /// Chunks are written before the index, so a failed write leaves no
    /// metadata behind. Storing over an existing key replaces its content and
    /// caller fields but keeps its `created` timestamp.
    pub fn store(
        &mut self,
        key: &ObjectKey,
        content: &ContentPayload,
        fields: Option<&Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        let fingerprint = self.hasher.fingerprint(content);
        self.log_duplicates(key, &fingerprint);

        self.write_chunks(key, content)?;

        let now = Utc::now();
        let created = self.index.get(key).map(|r| r.created).unwrap_or(now);
        let mut record = MetadataRecord {
            id: key.clone(),
            content_hash: fingerprint.hash,
            size: fingerprint.size,
            created,
            last_accessed: now,
            last_updated: None,
            hash_degraded: fingerprint.degraded,
            fields: Map::new(),
        };
        merge_caller_fields(&mut record, fields);
        self.index.put(record.clone())?;

        self.cache.put(key.clone(), content.clone());
        info!(key = %key, hash = record.content_hash.short(), size = record.size, "Stored notebook");
        Ok(record)
    }

    /// Fetch the payload for `key`, from cache when possible.
    pub fn retrieve(&mut self, key: &ObjectKey) -> Result<ContentPayload, StorageError> {
        self.index.touch(key, Utc::now())?;
        self.load_payload(key)
    }

    /// Fetch one top-level section of an object payload.
    ///
    /// Payloads that are not JSON objects have no sections and are returned whole.
    pub fn retrieve_section(
        &mut self,
        key: &ObjectKey,
        section: &str,
    ) -> Result<Value, StorageError> {
        match self.retrieve(key)? {
            Value::Object(mut map) => {
                map.remove(section)
                    .ok_or_else(|| StorageError::SectionNotFound {
                        key: key.clone(),
                        section: section.to_string(),
                    })
            }
            other => Ok(other),
        }
    }

    /// Replace the content of an existing object.
    pub fn update(
        &mut self,
        key: &ObjectKey,
        content: &ContentPayload,
        fields: Option<&Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        let mut record = self.index.require(key)?.clone();
        let fingerprint = self.hasher.fingerprint(content);
        self.log_duplicates(key, &fingerprint);

        self.write_chunks(key, content)?;

        let now = Utc::now();
        let changed = record.content_hash != fingerprint.hash;
        record.content_hash = fingerprint.hash;
        record.size = fingerprint.size;
        record.hash_degraded = fingerprint.degraded;
        record.last_accessed = now;
        record.last_updated = Some(now);
        merge_caller_fields(&mut record, fields);
        self.index.put(record.clone())?;

        self.cache.put(key.clone(), content.clone());
        info!(key = %key, hash = record.content_hash.short(), changed, "Updated notebook");
        Ok(record)
    }

    /// Remove an object entirely. Chunk removal is best-effort.
    pub fn delete(&mut self, key: &ObjectKey) -> Result<MetadataRecord, StorageError> {
        let record = self.index.remove(key)?;
        self.cache.remove(key);
        match self.chunks.remove(key) {
            Ok(true) => {}
            Ok(false) => debug!(key = %key, "No chunk directory to remove"),
            Err(e) => warn!(key = %key, error = %e, "Failed to remove chunk directory"),
        }
        info!(key = %key, "Deleted notebook");
        Ok(record)
    }

    /// Records matching `filter`, most recently accessed first.
    pub fn list(&self, filter: &RecordFilter) -> Vec<MetadataRecord> {
        self.index.list(filter)
    }

    /// Groups of objects with identical content. Observational only.
    pub fn find_duplicate_notebooks(&self) -> DuplicateGroups {
        self.index.find_duplicates()
    }

    /// Merge `fields` into the metadata of `key` without touching its content.
    pub fn update_metadata(
        &mut self,
        key: &ObjectKey,
        fields: &Fields,
    ) -> Result<MetadataRecord, StorageError> {
        self.index.merge_fields(key, fields)
    }

    /// Delete every object not accessed within `days_threshold` days.
    ///
    /// The comparison is inclusive (`last_accessed <= now - days`), so a
    /// threshold of 0 removes everything. Returns the number deleted.
    pub fn clean_storage(&mut self, days_threshold: u64) -> Result<usize, StorageError> {
        let cutoff = stale_cutoff(Utc::now(), days_threshold);
        let mut removed = 0;
        for key in self.index.stale_keys(cutoff) {
            match self.delete(&key) {
                Ok(_) => removed += 1,
                Err(e) => warn!(key = %key, error = %e, "Failed to clean stale notebook"),
            }
        }
        info!(removed, days_threshold, "Cleaned storage");
        Ok(removed)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.index.contains(key)
    }

    /// Metadata for `key` without counting as an access
    pub fn record(&self, key: &ObjectKey) -> Option<&MetadataRecord> {
        self.index.get(key)
    }

    /// Keys currently held in memory, most recently used first
    pub fn cached_keys(&self) -> Vec<ObjectKey> {
        self.cache.keys()
    }

    /// Drop every in-memory payload. Durable state is untouched.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let mut total_size = 0;
        let mut disk_bytes = 0;
        let mut degraded_hashes = 0;
        for record in self.index.records() {
            total_size += record.size;
            match self.chunks.disk_usage(&record.id) {
                Ok(bytes) => disk_bytes += bytes,
                Err(e) => {
                    warn!(key = %record.id, error = %e, "Skipping disk usage for notebook")
                }
            }
            if record.hash_degraded {
                degraded_hashes += 1;
            }
        }
        let duplicates = self.index.find_duplicates();
        Ok(StorageStats {
            objects: self.index.len(),
            cached: self.cache.len(),
            cache_capacity: self.cache.capacity(),
            total_size,
            disk_bytes,
            duplicate_groups: duplicates.len(),
            duplicate_objects: duplicates.values().map(Vec::len).sum(),
            degraded_hashes,
            compression_available: Compressor::is_available(),
        })
    }

    fn write_chunks(
        &self,
        key: &ObjectKey,
        content: &ContentPayload,
    ) -> Result<ChunkManifest, StorageError> {
        let encoded = self.compressor.compress(content)?;
        let chunks = chunking::chunk(&encoded.bytes, self.settings.chunk_size);
        self.chunks.save(key, &chunks, encoded.compressed)
    }

    fn load_payload(&mut self, key: &ObjectKey) -> Result<ContentPayload, StorageError> {
        if self.cache.touch(key) {
            if let Some(payload) = self.cache.get(key) {
                debug!(key = %key, "Cache hit");
                return Ok(payload.clone());
            }
        }

        debug!(key = %key, "Cache miss; reading chunks");
        let loaded = self.chunks.load(key)?;
        let payload =
            self.compressor
                .decompress(key.as_str(), &loaded.bytes, loaded.manifest.compressed)?;
        self.cache.put(key.clone(), payload.clone());
        Ok(payload)
    }

    fn log_duplicates(&self, key: &ObjectKey, fingerprint: &Fingerprint) {
        if fingerprint.degraded {
            return;
        }
        let others = self
            .index
            .keys_for_hash(&fingerprint.hash)
            .into_iter()
            .filter(|k| k != key)
            .count();
        if others > 0 {
            info!(
                key = %key,
                hash = fingerprint.hash.short(),
                duplicates = others,
                "Content already stored under other keys"
            );
        }
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("settings", &self.settings)
            .field("objects", &self.index.len())
            .field("cache", &self.cache)
            .finish()
    }
}

fn merge_caller_fields(record: &mut MetadataRecord, fields: Option<&Fields>) {
    if let Some(fields) = fields {
        let ignored = record.merge_fields(fields);
        if !ignored.is_empty() {
            warn!(key = %record.id, ?ignored, "Ignoring metadata fields reserved by the store");
        }
    }
}

/// `now - days`, or the earliest representable time if that underflows.
fn stale_cutoff(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(chrono::Duration::try_days)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
