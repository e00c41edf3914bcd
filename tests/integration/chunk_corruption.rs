use notebook_store::{MemoryManager, StorageError, StoreSettings};
use serde_json::json;
use tempfile::TempDir;

use crate::integration::support::{key, open};

#[test]
fn missing_chunk_file_is_reported_by_ordinal() {
    let temp_dir = TempDir::new().unwrap();
    let settings = StoreSettings::new(temp_dir.path()).with_chunk_size(8);
    let mut manager = MemoryManager::open(settings).unwrap();
    manager
        .store(&key("nb1"), &json!({"text": "enough text to span chunks"}), None)
        .unwrap();
    manager.clear_cache();

    std::fs::remove_file(temp_dir.path().join("nb1").join("chunk_1.bin")).unwrap();
    match manager.retrieve(&key("nb1")) {
        Err(StorageError::MissingChunk { key: k, ordinal }) => {
            assert_eq!(k, key("nb1"));
            assert_eq!(ordinal, 1);
        }
        other => panic!("expected MissingChunk, got {:?}", other),
    }
}

#[test]
fn garbage_chunk_is_corrupted_content() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    manager.store(&key("bad"), &json!({"a": 1}), None).unwrap();
    manager.store(&key("good"), &json!({"b": 2}), None).unwrap();
    manager.clear_cache();

    std::fs::write(
        temp_dir.path().join("bad").join("chunk_0.bin"),
        b"\x00\x01 definitely not zlib or json",
    )
    .unwrap();

    assert!(matches!(
        manager.retrieve(&key("bad")),
        Err(StorageError::CorruptedContent { .. })
    ));
    // Other keys are unaffected
    assert_eq!(manager.retrieve(&key("good")).unwrap(), json!({"b": 2}));
    assert_eq!(manager.list(&Default::default()).len(), 2);
}

#[test]
fn legacy_uncompressed_chunks_are_readable() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    manager.store(&key("legacy"), &json!({"old": true}), None).unwrap();
    manager.clear_cache();

    // Rewrite the object as plain JSON with a manifest lacking the compression flag
    let dir = temp_dir.path().join("legacy");
    std::fs::write(dir.join("chunk_0.bin"), br#"{"old":true}"#).unwrap();
    std::fs::write(
        dir.join("chunks.json"),
        r#"{"chunk_count": 1, "chunk_size": 1048576, "written_at": "2024-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    assert_eq!(manager.retrieve(&key("legacy")).unwrap(), json!({"old": true}));
}

#[test]
fn missing_chunk_directory_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    manager.store(&key("nb1"), &json!({}), None).unwrap();
    manager.clear_cache();
    std::fs::remove_dir_all(temp_dir.path().join("nb1")).unwrap();

    assert!(manager.retrieve(&key("nb1")).unwrap_err().is_not_found());
    // The record itself is still deletable
    manager.delete(&key("nb1")).unwrap();
}
