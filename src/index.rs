//! Metadata Index
//!
//! Durable map from object key to [`MetadataRecord`], persisted as a single
//! JSON file and rewritten on every mutation. A reverse map from content hash
//! to the keys sharing it (the dedup index) is derived from the records on load
//! and kept in step with every `put`/`remove`.

use crate::compression;
use crate::error::StorageError;
use crate::fsio;
use crate::types::{ContentHash, ObjectKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Record fields managed by the store; caller metadata may not overwrite them.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "content_hash",
    "size",
    "created",
    "last_accessed",
    "last_updated",
    "hash_degraded",
];

/// Per-object metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: ObjectKey,
    pub content_hash: ContentHash,
    /// Byte length of the canonical serialization
    pub size: u64,
    pub created: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// The hash is a placeholder and does not participate in deduplication
    #[serde(default)]
    pub hash_degraded: bool,
    /// Caller-supplied fields, stored inline with the managed ones
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MetadataRecord {
    /// Look up a field by name, managed or caller-supplied, in its JSON form.
    pub fn field(&self, name: &str) -> Option<Value> {
        let managed = match name {
            "id" => serde_json::to_value(&self.id),
            "content_hash" => serde_json::to_value(&self.content_hash),
            "size" => serde_json::to_value(self.size),
            "created" => serde_json::to_value(self.created),
            "last_accessed" => serde_json::to_value(self.last_accessed),
            "last_updated" => match self.last_updated {
                Some(at) => serde_json::to_value(at),
                None => return None,
            },
            "hash_degraded" => serde_json::to_value(self.hash_degraded),
            _ => return self.fields.get(name).cloned(),
        };
        managed.ok()
    }

    /// Merge caller fields into the record. Reserved names are skipped and
    /// returned so the caller can report them.
    pub fn merge_fields(&mut self, fields: &Map<String, Value>) -> Vec<String> {
        let mut ignored = Vec::new();
        for (name, value) in fields {
            if RESERVED_FIELDS.contains(&name.as_str()) {
                ignored.push(name.clone());
            } else {
                self.fields.insert(name.clone(), value.clone());
            }
        }
        ignored
    }
}

/// Equality filter over record fields
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    equals: BTreeMap<String, Value>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn matches(&self, record: &MetadataRecord) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| record.field(field).as_ref() == Some(expected))
    }
}

/// Duplicate groups: hash -> records sharing it, ordered by key
pub type DuplicateGroups = BTreeMap<ContentHash, Vec<MetadataRecord>>;

/// Persistent metadata index with derived dedup index
#[derive(Debug)]
pub struct MetadataIndex {
    path: PathBuf,
    records: HashMap<ObjectKey, MetadataRecord>,
    dedup: HashMap<ContentHash, BTreeSet<ObjectKey>>,
}

impl MetadataIndex {
    /// Empty index that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: HashMap::new(),
            dedup: HashMap::new(),
        }
    }

    /// Load the index at `path`. A missing file is an empty index.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let mut index = Self::new(path);
        let raw = match std::fs::read(&index.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %index.path.display(), "No metadata index yet; starting empty");
                return Ok(index);
            }
            Err(e) => return Err(StorageError::io(&index.path, e)),
        };

        let stored: HashMap<ObjectKey, MetadataRecord> =
            compression::from_json_slice(&raw).map_err(|e| StorageError::CorruptedIndex {
                path: index.path.clone(),
                reason: e.to_string(),
            })?;
        for (key, mut record) in stored {
            if record.id != key {
                warn!(
                    key = %key,
                    id = %record.id,
                    "Index record id differs from its key; using key"
                );
                record.id = key.clone();
            }
            index.records.insert(key, record);
        }
        index.rebuild_dedup_index();

        info!(
            path = %index.path.display(),
            records = index.records.len(),
            hashes = index.dedup.len(),
            "Loaded metadata index"
        );
        Ok(index)
    }

    /// Write the whole index to disk.
    pub fn save(&self) -> Result<(), StorageError> {
        let ordered: BTreeMap<&ObjectKey, &MetadataRecord> = self.records.iter().collect();
        let json = serde_json::to_vec_pretty(&ordered)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fsio::write_atomic(&self.path, &json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&MetadataRecord> {
        self.records.get(key)
    }

    /// Like [`MetadataIndex::get`] but `NotFound` when absent
    pub fn require(&self, key: &ObjectKey) -> Result<&MetadataRecord, StorageError> {
        self.records
            .get(key)
            .ok_or_else(|| StorageError::not_found(key))
    }

    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.values()
    }

    /// Insert or replace a record and persist. Returns the previous record.
    ///
    /// If persisting fails, the in-memory index is restored to its prior state.
    pub fn put(&mut self, record: MetadataRecord) -> Result<Option<MetadataRecord>, StorageError> {
        let key = record.id.clone();
        let previous = self.insert_record(record);
        if let Err(e) = self.save() {
            self.remove_record(&key);
            if let Some(prev) = previous {
                self.insert_record(prev);
            }
            return Err(e);
        }
        Ok(previous)
    }

    /// Remove a record and persist.
    pub fn remove(&mut self, key: &ObjectKey) -> Result<MetadataRecord, StorageError> {
        let removed = self
            .remove_record(key)
            .ok_or_else(|| StorageError::not_found(key))?;
        if let Err(e) = self.save() {
            self.insert_record(removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Set `last_accessed` and persist.
    pub fn touch(
        &mut self,
        key: &ObjectKey,
        at: DateTime<Utc>,
    ) -> Result<MetadataRecord, StorageError> {
        let mut record = self.require(key)?.clone();
        record.last_accessed = at;
        self.put(record.clone())?;
        Ok(record)
    }

    /// Merge caller fields into an existing record and persist.
    pub fn merge_fields(
        &mut self,
        key: &ObjectKey,
        fields: &Map<String, Value>,
    ) -> Result<MetadataRecord, StorageError> {
        let mut record = self.require(key)?.clone();
        let ignored = record.merge_fields(fields);
        if !ignored.is_empty() {
            warn!(key = %key, ?ignored, "Ignoring metadata fields reserved by the store");
        }
        self.put(record.clone())?;
        Ok(record)
    }

    /// Records matching `filter`, most recently accessed first.
    pub fn list(&self, filter: &RecordFilter) -> Vec<MetadataRecord> {
        let mut out: Vec<MetadataRecord> = self
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    /// Recompute the hash -> keys map from the records.
    pub fn rebuild_dedup_index(&mut self) {
        self.dedup.clear();
        for record in self.records.values() {
            self.dedup
                .entry(record.content_hash.clone())
                .or_default()
                .insert(record.id.clone());
        }
    }

    /// Keys currently stored under `hash`, in key order
    pub fn keys_for_hash(&self, hash: &ContentHash) -> Vec<ObjectKey> {
        self.dedup
            .get(hash)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Hashes shared by more than one key, with their records
    pub fn find_duplicates(&self) -> DuplicateGroups {
        self.dedup
            .iter()
            .filter(|(_, keys)| keys.len() > 1)
            .map(|(hash, keys)| {
                let records = keys
                    .iter()
                    .filter_map(|k| self.records.get(k).cloned())
                    .collect();
                (hash.clone(), records)
            })
            .collect()
    }

    /// Keys whose `last_accessed` is at or before `cutoff`
    pub fn stale_keys(&self, cutoff: DateTime<Utc>) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .records
            .values()
            .filter(|r| r.last_accessed <= cutoff)
            .map(|r| r.id.clone())
            .collect();
        keys.sort();
        keys
    }

    fn insert_record(&mut self, record: MetadataRecord) -> Option<MetadataRecord> {
        let key = record.id.clone();
        let hash = record.content_hash.clone();
        let previous = self.records.insert(key.clone(), record);
        if let Some(prev) = &previous {
            if prev.content_hash != hash {
                debug!(
                    key = %key,
                    from = prev.content_hash.short(),
                    to = hash.short(),
                    "Moving dedup entry"
                );
                self.unlink(&prev.content_hash, &key);
            }
        }
        self.dedup.entry(hash).or_default().insert(key);
        previous
    }

    fn remove_record(&mut self, key: &ObjectKey) -> Option<MetadataRecord> {
        let removed = self.records.remove(key)?;
        self.unlink(&removed.content_hash, key);
        Some(removed)
    }

    fn unlink(&mut self, hash: &ContentHash, key: &ObjectKey) {
        if let Some(bucket) = self.dedup.get_mut(hash) {
            bucket.remove(key);
            if bucket.is_empty() {
                self.dedup.remove(hash);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn dedup_bucket_count(&self) -> usize {
        self.dedup.len()
    }
}
