use serde_json::json;
use tempfile::TempDir;

use crate::integration::support::{key, open_with_cache};

#[test]
fn cache_holds_most_recently_used_keys() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open_with_cache(temp_dir.path(), 3);
    for i in 0..6 {
        manager
            .store(&key(&format!("nb{}", i)), &json!({ "i": i }), None)
            .unwrap();
    }

    let cached: Vec<String> = manager
        .cached_keys()
        .into_iter()
        .map(|k| k.to_string())
        .collect();
    assert_eq!(cached, vec!["nb5", "nb4", "nb3"]);
}

#[test]
fn retrieve_promotes_and_reloads_evicted_entries() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open_with_cache(temp_dir.path(), 2);
    manager.store(&key("a"), &json!("a"), None).unwrap();
    manager.store(&key("b"), &json!("b"), None).unwrap();

    // Promote a, then c evicts b
    manager.retrieve(&key("a")).unwrap();
    manager.store(&key("c"), &json!("c"), None).unwrap();
    let cached: Vec<String> = manager
        .cached_keys()
        .into_iter()
        .map(|k| k.to_string())
        .collect();
    assert_eq!(cached, vec!["c", "a"]);

    // Evicted entries come back from chunks
    assert_eq!(manager.retrieve(&key("b")).unwrap(), json!("b"));
    assert_eq!(manager.cached_keys().len(), 2);
    assert_eq!(manager.cached_keys()[0], key("b"));
}

#[test]
fn cold_and_cached_reads_agree() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open_with_cache(temp_dir.path(), 1);
    let payload = json!({"pages": [{"id": "p1", "strokes": [1, 2, 3]}], "summary": null});
    manager.store(&key("nb1"), &payload, None).unwrap();

    let cached = manager.retrieve(&key("nb1")).unwrap();
    manager.clear_cache();
    let cold = manager.retrieve(&key("nb1")).unwrap();
    assert_eq!(cached, payload);
    assert_eq!(cold, payload);
}

#[test]
fn delete_drops_cache_entry() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = open_with_cache(temp_dir.path(), 4);
    manager.store(&key("nb1"), &json!({}), None).unwrap();
    manager.delete(&key("nb1")).unwrap();
    assert!(manager.cached_keys().is_empty());
}
