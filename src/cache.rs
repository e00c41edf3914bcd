//! In-memory LRU cache of decompressed notebook payloads
//!
//! Entries carry the time of their last access. The cache never evicts on its
//! own between calls: `put` inserts and then runs
//! [`PayloadCache::evict_if_over_capacity`], which drops least-recently-used
//! entries until the bound holds again. Eviction only forgets the in-memory
//! copy; durable state is untouched.

use crate::types::{ContentPayload, ObjectKey};
use chrono::{DateTime, Utc};
use lru::LruCache;
use tracing::debug;

/// Default number of notebooks kept in memory
pub const DEFAULT_CACHE_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: ContentPayload,
    last_access: DateTime<Utc>,
}

/// Bounded key -> payload cache
pub struct PayloadCache {
    entries: LruCache<ObjectKey, CacheEntry>,
    capacity: usize,
}

impl PayloadCache {
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Configuration validation rejects that value.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        Self {
            entries: LruCache::unbounded(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.entries.contains(key)
    }

    /// Cached payload for `key`. Does not count as an access; see [`PayloadCache::touch`].
    pub fn get(&self, key: &ObjectKey) -> Option<&ContentPayload> {
        self.entries.peek(key).map(|entry| &entry.payload)
    }

    /// Mark `key` as just used. Returns `false` on a miss.
    pub fn touch(&mut self, key: &ObjectKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Insert or overwrite `key`, then evict down to capacity.
    /// Returns the keys that were evicted.
    pub fn put(&mut self, key: ObjectKey, payload: ContentPayload) -> Vec<ObjectKey> {
        self.entries.put(
            key,
            CacheEntry {
                payload,
                last_access: Utc::now(),
            },
        );
        self.evict_if_over_capacity()
    }

    /// Drop least-recently-used entries while over capacity.
    pub fn evict_if_over_capacity(&mut self) -> Vec<ObjectKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            match self.entries.pop_lru() {
                Some((key, entry)) => {
                    debug!(key = %key, last_access = %entry.last_access, "Evicted from cache");
                    evicted.push(key);
                }
                None => break,
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<ContentPayload> {
        self.entries.pop(key).map(|entry| entry.payload)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached keys, most recently used first
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn last_access(&self, key: &ObjectKey) -> Option<DateTime<Utc>> {
        self.entries.peek(key).map(|entry| entry.last_access)
    }
}

impl std::fmt::Debug for PayloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
