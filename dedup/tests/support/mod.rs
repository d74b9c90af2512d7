//! Shared support for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use dedup::error::DedupResult;
use dedup::store::base::CacheStore;
use dedup::types::CacheMap;

static TRACING: Once = Once::new();

/// Installs a fmt subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_test_writer()
            .init();
    });
}

/// [`CacheStore`] double that serves a fixed cache and records interactions.
///
/// Counts loads and captures every saved map, so tests can assert on lazy-load
/// behavior and on exactly what was persisted.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    cache: Arc<Mutex<CacheMap>>,
    loads: Arc<AtomicUsize>,
    saves: Arc<Mutex<Vec<CacheMap>>>,
}

impl RecordingStore {
    pub fn with_cache(cache: CacheMap) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
            ..Self::default()
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn saved(&self) -> Vec<CacheMap> {
        self.saves.lock().unwrap().clone()
    }
}

impl CacheStore for RecordingStore {
    async fn load(&self) -> DedupResult<CacheMap> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.cache.lock().unwrap().clone())
    }

    async fn save(&self, records: &CacheMap) -> DedupResult<()> {
        self.saves.lock().unwrap().push(records.clone());
        Ok(())
    }
}
