//! Shared handle
//!
//! [`SharedMemoryManager`] wraps one [`MemoryManager`] for use from several
//! threads or tasks. Every call takes the manager mutex for its duration;
//! writes additionally take the key's write lock so they queue behind any
//! [`SharedMemoryManager::modify`] in flight on the same key.
//!
//! The `*_async` variants move the blocking call onto tokio's blocking pool.

use crate::concurrency::KeyLockManager;
use crate::config::StoreSettings;
use crate::error::{ApiError, StorageError};
use crate::index::{DuplicateGroups, MetadataRecord, RecordFilter};
use crate::manager::{Fields, MemoryManager, StorageStats};
use crate::types::{ContentPayload, ObjectKey};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Cloneable, thread-safe handle to one memory manager
#[derive(Clone, Debug)]
pub struct SharedMemoryManager {
    inner: Arc<Mutex<MemoryManager>>,
    locks: KeyLockManager,
}

impl SharedMemoryManager {
    pub fn new(manager: MemoryManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
            locks: KeyLockManager::new(),
        }
    }

    pub fn open(settings: StoreSettings) -> Result<Self, ApiError> {
        Ok(Self::new(MemoryManager::open(settings)?))
    }

    /// Run `f` with exclusive access to the manager.
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryManager) -> R) -> R {
        let mut manager = self.inner.lock();
        f(&mut manager)
    }

    pub fn store(
        &self,
        key: &ObjectKey,
        content: &ContentPayload,
        fields: Option<&Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        let lock = self.locks.get_lock(key);
        let _guard = lock.write();
        self.inner.lock().store(key, content, fields)
    }

    pub fn retrieve(&self, key: &ObjectKey) -> Result<ContentPayload, StorageError> {
        self.inner.lock().retrieve(key)
    }

    pub fn retrieve_section(&self, key: &ObjectKey, section: &str) -> Result<Value, StorageError> {
        self.inner.lock().retrieve_section(key, section)
    }

    pub fn update(
        &self,
        key: &ObjectKey,
        content: &ContentPayload,
        fields: Option<&Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        let lock = self.locks.get_lock(key);
        let _guard = lock.write();
        self.inner.lock().update(key, content, fields)
    }

    pub fn delete(&self, key: &ObjectKey) -> Result<MetadataRecord, StorageError> {
        let lock = self.locks.get_lock(key);
        let _guard = lock.write();
        self.inner.lock().delete(key)
    }

    pub fn list(&self, filter: &RecordFilter) -> Vec<MetadataRecord> {
        self.inner.lock().list(filter)
    }

    pub fn find_duplicate_notebooks(&self) -> DuplicateGroups {
        self.inner.lock().find_duplicate_notebooks()
    }

    pub fn update_metadata(
        &self,
        key: &ObjectKey,
        fields: &Fields,
    ) -> Result<MetadataRecord, StorageError> {
        let lock = self.locks.get_lock(key);
        let _guard = lock.write();
        self.inner.lock().update_metadata(key, fields)
    }

    pub fn clean_storage(&self, days_threshold: u64) -> Result<usize, StorageError> {
        let removed = self.inner.lock().clean_storage(days_threshold)?;
        self.locks.prune();
        Ok(removed)
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        self.inner.lock().stats()
    }

    /// Replace the content of `key` with `f(current)`.
    ///
    /// The key's write lock is held across the read and the write, so
    /// concurrent writers to the same key cannot interleave. The manager mutex
    /// is released while `f` runs.
    pub fn modify<F>(&self, key: &ObjectKey, f: F) -> Result<MetadataRecord, StorageError>
    where
        F: FnOnce(ContentPayload) -> ContentPayload,
    {
        let lock = self.locks.get_lock(key);
        let _guard = lock.write();
        let current = self.inner.lock().retrieve(key)?;
        let next = f(current);
        self.inner.lock().update(key, &next, None)
    }

    /// Run a blocking closure on tokio's blocking pool.
    pub async fn run_blocking<R, F>(&self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(SharedMemoryManager) -> Result<R, StorageError> + Send + 'static,
        R: Send + 'static,
    {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || f(handle))
            .await
            .map_err(|e| StorageError::Background(e.to_string()))?
    }

    pub async fn store_async(
        &self,
        key: ObjectKey,
        content: ContentPayload,
        fields: Option<Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        self.run_blocking(move |shared| shared.store(&key, &content, fields.as_ref()))
            .await
    }

    pub async fn retrieve_async(&self, key: ObjectKey) -> Result<ContentPayload, StorageError> {
        self.run_blocking(move |shared| shared.retrieve(&key)).await
    }

    pub async fn retrieve_section_async(
        &self,
        key: ObjectKey,
        section: String,
    ) -> Result<Value, StorageError> {
        self.run_blocking(move |shared| shared.retrieve_section(&key, &section))
            .await
    }

    pub async fn update_async(
        &self,
        key: ObjectKey,
        content: ContentPayload,
        fields: Option<Fields>,
    ) -> Result<MetadataRecord, StorageError> {
        self.run_blocking(move |shared| shared.update(&key, &content, fields.as_ref()))
            .await
    }

    pub async fn delete_async(&self, key: ObjectKey) -> Result<MetadataRecord, StorageError> {
        self.run_blocking(move |shared| shared.delete(&key)).await
    }

    pub async fn update_metadata_async(
        &self,
        key: ObjectKey,
        fields: Fields,
    ) -> Result<MetadataRecord, StorageError> {
        self.run_blocking(move |shared| shared.update_metadata(&key, &fields))
            .await
    }

    pub async fn clean_storage_async(&self, days_threshold: u64) -> Result<usize, StorageError> {
        self.run_blocking(move |shared| shared.clean_storage(days_threshold))
            .await
    }

    pub async fn modify_async<F>(
        &self,
        key: ObjectKey,
        f: F,
    ) -> Result<MetadataRecord, StorageError>
    where
        F: FnOnce(ContentPayload) -> ContentPayload + Send + 'static,
    {
        self.run_blocking(move |shared| shared.modify(&key, f)).await
    }
}
