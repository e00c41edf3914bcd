//! Payload compression
//!
//! Payloads are serialized to JSON and deflated with zlib. Whether a chunk set
//! is compressed is recorded explicitly in its manifest, so decoding never has
//! to guess; only manifests written before the flag existed go through the
//! inflate-then-parse fallback.

use crate::error::StorageError;
use crate::types::ContentPayload;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

/// Default zlib level (0 = store, 9 = best)
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Highest accepted compression level
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Serialized payload ready for chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContent {
    pub bytes: Vec<u8>,
    pub compressed: bool,
}

/// JSON + zlib codec for notebook payloads
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    level: u32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Compressor {
    /// Levels above 9 are clamped; configuration rejects them before we get here.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(MAX_COMPRESSION_LEVEL),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Whether this build can deflate at all
    pub fn is_available() -> bool {
        cfg!(feature = "compression")
    }

    pub fn compress(&self, payload: &ContentPayload) -> Result<EncodedContent, StorageError> {
        let json =
            serde_json::to_vec(payload).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.encode(json)
    }

    #[cfg(feature = "compression")]
    fn encode(&self, json: Vec<u8>) -> Result<EncodedContent, StorageError> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let raw_len = json.len();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(&json)
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        let bytes = encoder
            .finish()
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        tracing::debug!(
            raw_len,
            compressed_len = bytes.len(),
            level = self.level,
            "Compressed payload"
        );
        Ok(EncodedContent {
            bytes,
            compressed: true,
        })
    }

    #[cfg(not(feature = "compression"))]
    fn encode(&self, json: Vec<u8>) -> Result<EncodedContent, StorageError> {
        info!(
            raw_len = json.len(),
            "Compression unavailable in this build; storing uncompressed JSON"
        );
        Ok(EncodedContent {
            bytes: json,
            compressed: false,
        })
    }

    /// Decode bytes produced by [`Compressor::compress`].
    ///
    /// `compressed` comes from the chunk manifest; `None` means the manifest
    /// predates the flag and both encodings are tried.
    pub fn decompress(
        &self,
        key: &str,
        bytes: &[u8],
        compressed: Option<bool>,
    ) -> Result<ContentPayload, StorageError> {
        match compressed {
            Some(true) => {
                let json = inflate(bytes).map_err(|reason| corrupted(key, reason))?;
                parse(&json).map_err(|reason| corrupted(key, reason))
            }
            Some(false) => parse(bytes).map_err(|reason| corrupted(key, reason)),
            None => match inflate(bytes) {
                Ok(json) => parse(&json).map_err(|reason| corrupted(key, reason)),
                Err(inflate_err) => {
                    info!(key, "Chunk set is not zlib data; reading it as plain JSON");
                    parse(bytes).map_err(|parse_err| {
                        corrupted(
                            key,
                            format!("inflate failed ({}); parse failed ({})", inflate_err, parse_err),
                        )
                    })
                }
            },
        }
    }
}

fn corrupted(key: &str, reason: String) -> StorageError {
    StorageError::CorruptedContent {
        key: key.to_string(),
        reason,
    }
}

fn parse(bytes: &[u8]) -> Result<ContentPayload, String> {
    from_json_slice(bytes).map_err(|e| format!("invalid JSON: {}", e))
}

/// Parse JSON without serde_json's nesting limit.
///
/// `serde_json::to_vec` writes payloads of any depth, so reading them back must
/// accept any depth too.
pub(crate) fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value: T = Deserialize::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

#[cfg(feature = "compression")]
fn inflate(bytes: &[u8]) -> Result<Vec<u8>, String> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| format!("zlib inflate failed: {}", e))?;
    Ok(out)
}

#[cfg(not(feature = "compression"))]
fn inflate(_bytes: &[u8]) -> Result<Vec<u8>, String> {
    Err("built without compression support".to_string())
}
