use notebook_store::chunking::{chunk, dechunk};
use notebook_store::compression::Compressor;
use notebook_store::hasher::{canonical_json, ContentHasher};
use notebook_store::{MemoryManager, StoreSettings};
use proptest::prelude::*;
use serde_json::Value;

use crate::integration::support::key;

/// Arbitrary JSON values, finite floats included.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        any::<f64>()
            .prop_filter("JSON has no NaN or infinity", |f| f.is_finite())
            .prop_map(|f| serde_json::json!(f)),
        "\\PC{0,40}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z#_]{1,10}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn compress_then_decompress_is_identity(value in json_value()) {
        let compressor = Compressor::default();
        let encoded = compressor.compress(&value).unwrap();
        let decoded = compressor
            .decompress("prop", &encoded.bytes, Some(encoded.compressed))
            .unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn dechunk_reverses_chunk(
        bytes in prop::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1usize..512,
    ) {
        let chunks = chunk(&bytes, chunk_size);
        prop_assert!(chunks.iter().all(|c| c.len() <= chunk_size));
        prop_assert_eq!(dechunk(&chunks), bytes);
    }

    #[test]
    fn hash_is_stable_across_canonical_reparse(value in json_value()) {
        let hasher = ContentHasher::new();
        let canonical = canonical_json(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&canonical).unwrap();
        prop_assert_eq!(&reparsed, &value);

        let first = hasher.hash(&value).unwrap();
        let second = hasher.hash(&reparsed).unwrap();
        prop_assert_eq!(first.hash, second.hash);
        prop_assert_eq!(first.size, canonical.len() as u64);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stored_payload_round_trips_through_chunks(
        value in json_value(),
        chunk_size in 1usize..64,
    ) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let settings = StoreSettings::new(temp_dir.path()).with_chunk_size(chunk_size);
        let mut manager = MemoryManager::open(settings).unwrap();

        manager.store(&key("prop"), &value, None).unwrap();
        prop_assert_eq!(manager.retrieve(&key("prop")).unwrap(), value.clone());
        manager.clear_cache();
        prop_assert_eq!(manager.retrieve(&key("prop")).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn finite_floats_survive_a_cold_read(
        f in any::<f64>().prop_filter("finite", |f| f.is_finite()),
    ) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut manager = MemoryManager::open(StoreSettings::new(temp_dir.path())).unwrap();
        let payload = serde_json::json!({ "f": f });

        let record = manager.store(&key("float"), &payload, None).unwrap();
        manager.clear_cache();
        let read_back = manager.retrieve(&key("float")).unwrap();
        prop_assert_eq!(read_back["f"].as_f64(), Some(f));
        let rehashed = ContentHasher::new().hash(&read_back).unwrap();
        prop_assert_eq!(rehashed.hash, record.content_hash);
    }

    #[test]
    fn deeply_nested_payloads_survive_a_cold_read(
        depth in 128usize..400,
        leaf in any::<i64>(),
    ) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut manager = MemoryManager::open(StoreSettings::new(temp_dir.path())).unwrap();
        let mut payload = serde_json::json!(leaf);
        for _ in 0..depth {
            payload = serde_json::json!([payload]);
        }

        let record = manager.store(&key("deep"), &payload, None).unwrap();
        prop_assert!(record.hash_degraded);
        manager.clear_cache();
        prop_assert_eq!(manager.retrieve(&key("deep")).unwrap(), payload);
    }
}
