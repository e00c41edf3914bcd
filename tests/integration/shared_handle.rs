use notebook_store::{RecordFilter, SharedMemoryManager, StoreSettings};
use serde_json::json;
use std::thread;
use tempfile::TempDir;

use crate::integration::support::key;

fn shared(temp_dir: &TempDir) -> SharedMemoryManager {
    SharedMemoryManager::open(StoreSettings::new(temp_dir.path()).with_cache_size(4)).unwrap()
}

#[test]
fn threads_store_distinct_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = shared(&temp_dir);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let name = format!("nb{}", i);
                store
                    .store(&key(&name), &json!({ "page": i }), None)
                    .unwrap();
                store.retrieve(&key(&name)).unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), json!({ "page": i }));
    }

    assert_eq!(store.list(&RecordFilter::new()).len(), 8);
    assert!(store.with(|m| m.cached_keys().len()) <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_tasks_share_one_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = shared(&temp_dir);
    store
        .store_async(key("counter"), json!({"n": 0}), None)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .modify_async(key("counter"), |mut payload| {
                        let n = payload["n"].as_i64().unwrap_or_default();
                        payload["n"] = json!(n + 1);
                        payload
                    })
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(
        store.retrieve_async(key("counter")).await.unwrap(),
        json!({"n": 10})
    );
    let record = store.with(|m| m.record(&key("counter")).cloned()).unwrap();
    assert!(record.last_updated.is_some());
}
