use notebook_store::hasher::ContentHasher;
use serde_json::json;
use tempfile::TempDir;

use crate::integration::support::{key, open};

#[test]
fn identical_payloads_form_one_group() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    let payload = json!({"pages": [1, 2, 3]});

    manager.store(&key("a"), &payload, None).unwrap();
    manager.store(&key("b"), &payload, None).unwrap();
    manager.store(&key("c"), &json!({"pages": []}), None).unwrap();

    let groups = manager.find_duplicate_notebooks();
    assert_eq!(groups.len(), 1);
    let keys: Vec<&str> = groups
        .values()
        .next()
        .unwrap()
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn update_to_different_content_dissolves_group() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    let payload = json!({"pages": [1]});
    manager.store(&key("a"), &payload, None).unwrap();
    manager.store(&key("b"), &payload, None).unwrap();
    assert_eq!(manager.find_duplicate_notebooks().len(), 1);

    manager.update(&key("b"), &json!({"pages": [2]}), None).unwrap();
    assert!(manager.find_duplicate_notebooks().is_empty());

    manager.update(&key("b"), &payload, None).unwrap();
    assert_eq!(manager.find_duplicate_notebooks().len(), 1);
}

#[test]
fn key_order_does_not_change_hash() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    let first: serde_json::Value =
        serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": [true, null]}}"#).unwrap();
    let second: serde_json::Value =
        serde_json::from_str(r#"{"a": {"x": [true, null], "y": 1}, "b": 2}"#).unwrap();

    let r1 = manager.store(&key("first"), &first, None).unwrap();
    let r2 = manager.store(&key("second"), &second, None).unwrap();
    assert_eq!(r1.content_hash, r2.content_hash);
    assert_eq!(
        r1.content_hash,
        ContentHasher::new().hash(&first).unwrap().hash
    );
}

#[test]
fn deeply_nested_payload_degrades_hash_but_stores() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    let mut payload = json!(0);
    for _ in 0..200 {
        payload = json!([payload]);
    }

    let a = manager.store(&key("deep-a"), &payload, None).unwrap();
    let b = manager.store(&key("deep-b"), &payload, None).unwrap();
    assert!(a.hash_degraded && b.hash_degraded);
    assert_ne!(a.content_hash, b.content_hash);
    assert!(manager.find_duplicate_notebooks().is_empty());
    assert_eq!(manager.stats().unwrap().degraded_hashes, 2);

    // Readable from chunks, not only from the cache
    manager.clear_cache();
    assert_eq!(manager.retrieve(&key("deep-a")).unwrap(), payload);

    drop(manager);
    let mut reopened = open(temp_dir.path());
    assert_eq!(reopened.retrieve(&key("deep-b")).unwrap(), payload);
}
