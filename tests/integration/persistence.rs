use notebook_store::{Fields, MemoryManager, RecordFilter, StorageError, StoreSettings};
use serde_json::json;
use tempfile::TempDir;

use crate::integration::support::{key, open};

#[test]
fn reopened_store_serves_records_and_content() {
    let temp_dir = TempDir::new().unwrap();
    let payload = json!({"pages": [{"id": "p1", "text": "hello"}]});
    let stored = {
        let mut manager = open(temp_dir.path());
        let mut fields = Fields::new();
        fields.insert("owner".to_string(), json!("alice"));
        manager.store(&key("nb1"), &payload, Some(&fields)).unwrap();
        manager.store(&key("nb2"), &payload, None).unwrap()
    };

    let mut manager = open(temp_dir.path());
    assert_eq!(manager.list(&RecordFilter::new()).len(), 2);
    assert!(manager.cached_keys().is_empty());
    assert_eq!(manager.record(&key("nb2")).unwrap(), &stored);
    assert_eq!(
        manager.record(&key("nb1")).unwrap().field("owner"),
        Some(json!("alice"))
    );
    // Dedup index is rebuilt from the records
    assert_eq!(manager.find_duplicate_notebooks().len(), 1);
    assert_eq!(manager.retrieve(&key("nb1")).unwrap(), payload);
}

#[test]
fn index_file_is_pretty_json_keyed_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    manager.store(&key("b"), &json!(1), None).unwrap();
    manager.store(&key("a"), &json!(2), None).unwrap();

    let text = std::fs::read_to_string(temp_dir.path().join("metadata_index.json")).unwrap();
    assert!(text.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(parsed["a"]["id"], json!("a"));
    assert!(parsed["a"]["content_hash"].is_string());
}

#[test]
fn corrupted_index_fails_to_open() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("metadata_index.json"), "{ truncated").unwrap();

    let err = MemoryManager::open(StoreSettings::new(temp_dir.path())).unwrap_err();
    assert!(matches!(
        err,
        notebook_store::ApiError::StorageError(StorageError::CorruptedIndex { .. })
    ));
}

#[test]
fn store_uses_chunk_directory_layout() {
    let temp_dir = TempDir::new().unwrap();
    let settings = StoreSettings::new(temp_dir.path())
        .with_chunk_size(16)
        .with_compression_level(0);
    let mut manager = MemoryManager::open(settings).unwrap();
    let payload = json!({"text": "a fairly long page of handwriting recognition output"});
    manager.store(&key("nb1"), &payload, None).unwrap();

    let dir = temp_dir.path().join("nb1");
    assert!(dir.join("chunks.json").is_file());
    assert!(dir.join("chunk_0.bin").is_file());
    assert!(dir.join("chunk_1.bin").is_file());

    manager.clear_cache();
    assert_eq!(manager.retrieve(&key("nb1")).unwrap(), payload);
}

#[test]
fn deeply_nested_metadata_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let mut nested = json!("leaf");
    for _ in 0..200 {
        nested = json!({ "inner": nested });
    }
    {
        let mut manager = open(temp_dir.path());
        manager.store(&key("nb1"), &json!({}), None).unwrap();
        let mut fields = Fields::new();
        fields.insert("outline".to_string(), nested.clone());
        manager.update_metadata(&key("nb1"), &fields).unwrap();
    }

    let manager = open(temp_dir.path());
    assert_eq!(
        manager.record(&key("nb1")).unwrap().field("outline"),
        Some(nested)
    );
}
