//! Small filesystem helpers shared by the chunk store and the metadata index

use crate::error::StorageError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `bytes` to `path` and flush them to disk before returning.
pub(crate) fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(path).map_err(|e| StorageError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StorageError::io(path, e))?;
    file.sync_all().map_err(|e| StorageError::io(path, e))
}

/// Replace `path` with `bytes` via a sibling temp file and rename, so readers
/// see either the old or the new contents.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    write_synced(&tmp, bytes)?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Create `dir` and any missing parents.
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))
}

/// Recursively delete `dir`. Returns `false` if it did not exist.
pub(crate) fn remove_dir_if_exists(dir: &Path) -> Result<bool, StorageError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(dir, e)),
    }
}
