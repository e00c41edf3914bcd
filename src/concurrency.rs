//! Per-key locking
//!
//! Serializes read-modify-write sequences on one object while letting work on
//! other objects proceed. Single calls on the manager do not need it.

use crate::types::ObjectKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-object lock manager
///
/// Hands out one shared `RwLock` per key. Locks are created on first use and
/// dropped again by [`KeyLockManager::prune`] once nobody holds them.
pub struct KeyLockManager {
    locks: Arc<RwLock<HashMap<ObjectKey, Arc<RwLock<()>>>>>,
}

impl KeyLockManager {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or create the lock for `key`
    pub fn get_lock(&self, key: &ObjectKey) -> Arc<RwLock<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(key) {
                return lock.clone();
            }
        }

        // Double-check under the write lock; another thread may have created it
        let mut map = self.locks.write();
        map.entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Number of keys with a lock allocated
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    /// Drop locks no caller holds a handle to. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut map = self.locks.write();
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }
}

impl Default for KeyLockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for KeyLockManager {
    fn clone(&self) -> Self {
        Self {
            locks: self.locks.clone(),
        }
    }
}

impl std::fmt::Debug for KeyLockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLockManager")
            .field("locks", &self.len())
            .finish()
    }
}
