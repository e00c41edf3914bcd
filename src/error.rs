//! Error types
//!
//! `StorageError` covers every failure of the storage engine and is what the
//! `MemoryManager` operations return. `ApiError` is the outer error for
//! configuration, logging setup and the CLI.

use crate::types::ObjectKey;
use std::path::PathBuf;
use thiserror::Error;

/// Storage engine errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Missing chunk {ordinal} for object {key}")]
    MissingChunk { key: ObjectKey, ordinal: usize },

    #[error("Corrupted content for object {key}: {reason}")]
    CorruptedContent { key: String, reason: String },

    #[error("Corrupted metadata index {path}: {reason}")]
    CorruptedIndex { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Section '{section}' not found in object {key}")]
    SectionNotFound { key: ObjectKey, section: String },

    #[error("Invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Background(String),
}

impl StorageError {
    pub(crate) fn not_found(key: &ObjectKey) -> Self {
        StorageError::NotFound(key.to_string())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the errors a caller should treat as "this key does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Top-level API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
