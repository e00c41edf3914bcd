//! Fixed-size chunking of encoded payloads

/// Default chunk size: 1 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Split `bytes` into consecutive `chunk_size` slices.
///
/// The last chunk may be shorter. Empty input yields a single empty chunk so
/// that every stored object has at least one chunk file.
///
/// # Panics
///
/// Panics if `chunk_size` is zero. Configuration validation rejects that value.
pub fn chunk(bytes: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");
    if bytes.is_empty() {
        return vec![Vec::new()];
    }
    bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}

/// Concatenate chunks in order.
pub fn dechunk(chunks: &[Vec<u8>]) -> Vec<u8> {
    let total = chunks.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}
