use serde_json::json;
use tempfile::TempDir;

use crate::integration::support::{key, open};

#[test]
fn zero_day_threshold_removes_everything() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    for name in ["a", "b", "c"] {
        manager.store(&key(name), &json!({ "name": name }), None).unwrap();
    }

    assert_eq!(manager.clean_storage(0).unwrap(), 3);
    assert!(manager.list(&Default::default()).is_empty());
    assert!(manager.cached_keys().is_empty());
    for name in ["a", "b", "c"] {
        assert!(!temp_dir.path().join(name).exists());
    }
}

#[test]
fn recent_objects_survive_positive_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open(temp_dir.path());
    manager.store(&key("fresh"), &json!({}), None).unwrap();

    assert_eq!(manager.clean_storage(1).unwrap(), 0);
    assert!(manager.contains(&key("fresh")));
}

#[test]
fn stale_records_from_disk_are_cleaned() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut manager = open(temp_dir.path());
        manager.store(&key("old"), &json!({"v": 1}), None).unwrap();
        manager.store(&key("new"), &json!({"v": 2}), None).unwrap();
    }

    // Age one record by rewriting its access time in the index file
    let path = temp_dir.path().join("metadata_index.json");
    let mut index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let old = chrono::Utc::now() - chrono::Duration::days(30);
    index["old"]["last_accessed"] = json!(old);
    std::fs::write(&path, serde_json::to_string_pretty(&index).unwrap()).unwrap();

    let mut manager = open(temp_dir.path());
    assert_eq!(manager.clean_storage(7).unwrap(), 1);
    assert!(!manager.contains(&key("old")));
    assert!(manager.contains(&key("new")));
}
