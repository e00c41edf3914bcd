use notebook_store::{MemoryManager, ObjectKey, StoreSettings};
use std::path::Path;

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(name).unwrap()
}

pub fn open(dir: &Path) -> MemoryManager {
    open_with_cache(dir, 10)
}

pub fn open_with_cache(dir: &Path, cache_size: usize) -> MemoryManager {
    MemoryManager::open(StoreSettings::new(dir).with_cache_size(cache_size)).unwrap()
}
