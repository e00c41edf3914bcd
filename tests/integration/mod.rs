//! Integration tests for the notebook store

mod cache_eviction;
mod chunk_corruption;
mod clean_storage;
mod dedup_index;
mod persistence;
mod properties;
mod shared_handle;
mod support;
