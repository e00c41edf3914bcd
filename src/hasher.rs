//! Content hashing for notebook payloads
//!
//! Payloads are reduced to a canonical JSON string (object keys sorted at every
//! level, no insignificant whitespace) and digested with SHA-256. Two payloads
//! that are equal as JSON values always hash identically, regardless of the
//! order their keys were inserted in.

use crate::error::StorageError;
use crate::types::{ContentHash, ContentPayload};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Maximum number of nested arrays/objects canonicalization walks. Deeper
/// payloads are still stored, under a degraded hash.
pub const MAX_CANONICAL_DEPTH: usize = 127;

/// Result of fingerprinting a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: ContentHash,
    /// Byte length of the canonical serialization
    pub size: u64,
    /// True when canonicalization failed and `hash` is a unique placeholder
    pub degraded: bool,
}

/// Serialize a payload to its canonical string form.
pub fn canonical_json(payload: &ContentPayload) -> Result<String, StorageError> {
    let mut out = String::new();
    write_canonical(payload, 0, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, depth: usize, out: &mut String) -> Result<(), StorageError> {
    if matches!(value, Value::Array(_) | Value::Object(_)) && depth >= MAX_CANONICAL_DEPTH {
        return Err(StorageError::Serialization(format!(
            "payload nesting exceeds {} levels",
            MAX_CANONICAL_DEPTH
        )));
    }
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_json_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, depth + 1, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_json_string(key, out)?;
                out.push(':');
                write_canonical(item, depth + 1, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn push_json_string(s: &str, out: &mut String) -> Result<(), StorageError> {
    let escaped =
        serde_json::to_string(s).map_err(|e| StorageError::Serialization(e.to_string()))?;
    out.push_str(&escaped);
    Ok(())
}

/// Deterministic payload fingerprinting
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        ContentHasher
    }

    /// Hash a payload. Fails only if the payload cannot be canonicalized.
    pub fn hash(&self, payload: &ContentPayload) -> Result<Fingerprint, StorageError> {
        let canonical = canonical_json(payload)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Fingerprint {
            hash: ContentHash::from_digest(&digest),
            size: canonical.len() as u64,
            degraded: false,
        })
    }

    /// Hash a payload, falling back to a unique placeholder on failure.
    ///
    /// The placeholder never collides with another payload, so a degraded
    /// object silently drops out of duplicate detection.
    pub fn fingerprint(&self, payload: &ContentPayload) -> Fingerprint {
        match self.hash(payload) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                let nanos = chrono::Utc::now()
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| chrono::Utc::now().timestamp_micros());
                let size = serde_json::to_vec(payload)
                    .map(|bytes| bytes.len() as u64)
                    .unwrap_or(0);
                warn!(
                    error = %e,
                    "Content hash degraded to placeholder; duplicate detection disabled for this object"
                );
                Fingerprint {
                    hash: ContentHash::degraded(nanos),
                    size,
                    degraded: true,
                }
            }
        }
    }
}
