//! Core types for the notebook storage engine.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ContentPayload: arbitrary JSON notebook content (pages, tags, text, ...)
pub type ContentPayload = serde_json::Value;

/// Name of the index file kept at the storage root. No key may shadow it or
/// its temp file.
pub const INDEX_FILE_NAME: &str = "metadata_index.json";

/// ObjectKey: caller-assigned identifier of a stored notebook.
///
/// Every key names a directory under the storage root, so construction rejects
/// anything that could escape the root or collide with internal files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        if let Some(reason) = Self::invalid_reason(&key) {
            return Err(StorageError::InvalidKey { key, reason });
        }
        Ok(Self(key))
    }

    fn invalid_reason(key: &str) -> Option<&'static str> {
        if key.is_empty() {
            Some("key is empty")
        } else if key.starts_with('.') {
            Some("key may not start with '.'")
        } else if key.contains(['/', '\\', '\0']) {
            Some("key may not contain path separators or NUL")
        } else if key.starts_with(INDEX_FILE_NAME) {
            Some("key collides with the metadata index file")
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ContentHash: hex SHA-256 of a payload's canonical serialization.
///
/// A degraded hash is a unique placeholder used when the payload could not be
/// canonicalized; it never matches another payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

const DEGRADED_PREFIX: &str = "degraded-";

impl ContentHash {
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn degraded(nanos: i64) -> Self {
        Self(format!("{}{}", DEGRADED_PREFIX, nanos))
    }

    pub fn is_degraded(&self) -> bool {
        self.0.starts_with(DEGRADED_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines and tables
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
