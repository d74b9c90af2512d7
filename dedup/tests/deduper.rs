//! Integration tests for change detection.

mod support;

use serde_json::json;

use dedup::config::PageLimits;
use dedup::dedup::Deduper;
use dedup::error::{DedupResult, ErrorKind};
use dedup::hash::hash_record;
use dedup::store::base::CacheStore;
use dedup::store::memory::MemoryBackend;
use dedup::store::paginated::PaginatedStore;
use dedup::types::{CacheMap, PollRecord, RecordId};
use dedup::{bail, dedup_error};

use crate::support::{RecordingStore, init_test_tracing};

fn record(value: serde_json::Value) -> PollRecord {
    PollRecord::from_value(value).unwrap()
}

#[tokio::test]
async fn classifies_created_and_updated_records() {
    init_test_tracing();

    // Record 1 is cached under a stale hash; record 2 was never seen.
    let store = RecordingStore::with_cache(CacheMap::from([(
        "1".to_string(),
        "some_hash_here".to_string(),
    )]));
    let mut deduper = Deduper::new(store);

    let records = [record(json!({"id": 1, "foo": "bar"})), record(json!({"id": 2}))];
    let changes = deduper.find_changes(&records, false).await.unwrap();

    assert_eq!(changes.created.len(), 1);
    assert_eq!(changes.created[0].id, RecordId::Integer(2));
    assert_eq!(changes.created[0].hash, hash_record(&records[1]));

    assert_eq!(changes.updated.len(), 1);
    assert_eq!(changes.updated[0].id, RecordId::Integer(1));
    assert_eq!(changes.updated[0].hash, hash_record(&records[0]));

    assert_eq!(
        changes.all,
        changes
            .created
            .iter()
            .chain(changes.updated.iter())
            .cloned()
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn omits_unchanged_records() {
    init_test_tracing();

    let unchanged = record(json!({"id": 1, "foo": "bar"}));
    let store = RecordingStore::with_cache(CacheMap::from([(
        "1".to_string(),
        hash_record(&unchanged),
    )]));
    let mut deduper = Deduper::new(store);

    let changes = deduper.find_changes(&[unchanged], false).await.unwrap();
    assert!(changes.is_empty());
}

#[tokio::test]
async fn preserves_input_order_within_each_list() {
    init_test_tracing();

    let store = RecordingStore::default();
    let mut deduper = Deduper::new(store);

    let records = [
        record(json!({"id": "c"})),
        record(json!({"id": "a"})),
        record(json!({"id": "b"})),
    ];
    let changes = deduper.find_changes(&records, false).await.unwrap();

    let created: Vec<String> = changes
        .created
        .iter()
        .map(|change| change.id.to_string())
        .collect();
    assert_eq!(created, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn reuses_the_loaded_cache_across_calls() {
    init_test_tracing();

    let store = RecordingStore::default();
    let mut deduper = Deduper::new(store.clone());

    deduper.find_changes(&[], false).await.unwrap();
    deduper.find_changes(&[], false).await.unwrap();
    assert_eq!(store.load_count(), 1);

    deduper.find_changes(&[], true).await.unwrap();
    assert_eq!(store.load_count(), 2);
}

#[tokio::test]
async fn explicit_load_replaces_the_cached_view() {
    init_test_tracing();

    let store = RecordingStore::with_cache(CacheMap::from([(
        "1".to_string(),
        "remote_hash".to_string(),
    )]));
    let mut deduper = Deduper::new(store.clone());

    deduper.load().await.unwrap();
    assert_eq!(
        deduper.cache().and_then(|cache| cache.get("1")).cloned(),
        Some("remote_hash".to_string())
    );
    assert_eq!(store.load_count(), 1);
}

#[tokio::test]
async fn persist_merges_on_top_of_the_cache() {
    init_test_tracing();

    let store = RecordingStore::with_cache(CacheMap::from([(
        "item1".to_string(),
        "H1".to_string(),
    )]));
    let mut deduper = Deduper::new(store.clone());
    deduper.load().await.unwrap();

    let new_record = record(json!({"id": "item2", "name": "fresh"}));
    deduper.persist_changes(&[new_record.clone()]).await.unwrap();

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].get("item1"), Some(&"H1".to_string()));
    assert_eq!(saved[0].get("item2"), Some(&hash_record(&new_record)));

    // Persistence does not fold the merged map back into memory; that happens
    // through an explicit load.
    assert!(!deduper.cache().unwrap().contains_key("item2"));
}

#[tokio::test]
async fn persist_overwrites_existing_keys() {
    init_test_tracing();

    let store = RecordingStore::with_cache(CacheMap::from([(
        "1".to_string(),
        "stale_hash".to_string(),
    )]));
    let mut deduper = Deduper::new(store.clone());
    deduper.load().await.unwrap();

    let updated = record(json!({"id": 1, "foo": "new"}));
    deduper.persist_changes(&[updated.clone()]).await.unwrap();

    let saved = store.saved();
    assert_eq!(saved[0].get("1"), Some(&hash_record(&updated)));
}

#[tokio::test]
async fn persist_change_set_reuses_detected_hashes() {
    init_test_tracing();

    let store = RecordingStore::default();
    let mut deduper = Deduper::new(store.clone());

    let records = [record(json!({"id": 1, "foo": "bar"}))];
    let changes = deduper.find_changes(&records, false).await.unwrap();
    deduper.persist_change_set(&changes).await.unwrap();

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].get("1"), Some(&hash_record(&records[0])));
}

#[tokio::test]
async fn persist_with_unset_cache_saves_only_new_hashes() {
    init_test_tracing();

    let store = RecordingStore::with_cache(CacheMap::from([(
        "remote".to_string(),
        "H".to_string(),
    )]));
    let deduper = Deduper::new(store.clone());

    // No load has happened, so there is nothing to merge on top of.
    deduper
        .persist_changes(&[record(json!({"id": "fresh"}))])
        .await
        .unwrap();

    let saved = store.saved();
    assert_eq!(saved[0].len(), 1);
    assert!(saved[0].contains_key("fresh"));
}

#[tokio::test]
async fn initialize_ignores_remote_state() {
    init_test_tracing();

    let store = RecordingStore::with_cache(CacheMap::from([(
        "old".to_string(),
        "stale".to_string(),
    )]));
    let deduper = Deduper::new(store.clone());

    deduper
        .initialize(&[record(json!({"id": "seed", "v": 1}))])
        .await
        .unwrap();

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].len(), 1);
    assert!(saved[0].contains_key("seed"));
    assert_eq!(store.load_count(), 0);
}

/// Store double whose load always reports corruption.
#[derive(Debug, Clone)]
struct CorruptStore;

impl CacheStore for CorruptStore {
    async fn load(&self) -> DedupResult<CacheMap> {
        bail!(
            ErrorKind::CacheCorruption,
            "Dedup cache seems to be corrupted"
        );
    }

    async fn save(&self, _records: &CacheMap) -> DedupResult<()> {
        Err(dedup_error!(
            ErrorKind::TransportError,
            "Remote store request failed"
        ))
    }
}

#[tokio::test]
async fn failed_load_leaves_the_cache_unset() {
    init_test_tracing();

    let mut deduper = Deduper::new(CorruptStore);

    let err = deduper.find_changes(&[], false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CacheCorruption);
    assert!(deduper.cache().is_none());
}

#[tokio::test]
async fn full_poll_cycle_against_the_paginated_store() {
    init_test_tracing();

    let backend = MemoryBackend::new();
    let limits = PageLimits {
        max_value_size: 19,
        max_keys_per_page: 2,
    };
    let store = PaginatedStore::with_limits(backend, "owner_42", limits).unwrap();
    let mut deduper = Deduper::new(store);

    // First activation: bootstrap from the initial poll.
    let first_poll = [
        record(json!({"id": 1, "name": "alpha"})),
        record(json!({"id": 2, "name": "beta"})),
    ];
    deduper.initialize(&first_poll).await.unwrap();

    // Second poll: record 1 changed, record 3 is new, record 2 is untouched.
    let second_poll = [
        record(json!({"id": 1, "name": "alpha prime"})),
        record(json!({"id": 2, "name": "beta"})),
        record(json!({"id": 3, "name": "gamma"})),
    ];
    let changes = deduper.find_changes(&second_poll, false).await.unwrap();

    assert_eq!(changes.created.len(), 1);
    assert_eq!(changes.created[0].id, RecordId::Integer(3));
    assert_eq!(changes.updated.len(), 1);
    assert_eq!(changes.updated[0].id, RecordId::Integer(1));

    // Persist and reload: the third poll sees nothing new.
    deduper.persist_change_set(&changes).await.unwrap();
    let changes = deduper.find_changes(&second_poll, true).await.unwrap();
    assert!(changes.is_empty());
}
