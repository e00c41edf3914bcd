//! Notebook Store: content-hashed, chunked storage for notebook documents
//!
//! Persists JSON notebook payloads under string keys. Each payload is hashed
//! over its canonical serialization for deduplication reporting, compressed,
//! split into fixed-size chunks on disk and indexed in a single metadata file.
//! Recently used payloads stay decompressed in a bounded LRU cache.
//!
//! [`MemoryManager`] is the entry point; [`SharedMemoryManager`] wraps it for
//! multi-threaded and async callers.

pub mod cache;
pub mod chunk_store;
pub mod chunking;
pub mod compression;
pub mod concurrency;
pub mod config;
pub mod error;
mod fsio;
pub mod hasher;
pub mod index;
pub mod logging;
pub mod manager;
pub mod shared;
pub mod tooling;
pub mod types;

pub use config::{ConfigLoader, NotebookStoreConfig, StoreSettings};
pub use error::{ApiError, StorageError};
pub use index::{DuplicateGroups, MetadataRecord, RecordFilter};
pub use manager::{Fields, MemoryManager, StorageStats};
pub use shared::SharedMemoryManager;
pub use types::{ContentHash, ContentPayload, ObjectKey};
