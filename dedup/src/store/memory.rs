//! In-memory page backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{DedupResult, ErrorKind};
use crate::store::base::{PageBackend, PageBody};

/// Inner state of [`MemoryBackend`].
#[derive(Debug, Default)]
struct Inner {
    /// Stored page bodies indexed by derived key.
    pages: HashMap<String, PageBody>,
}

/// In-memory implementation of [`PageBackend`].
///
/// Keeps every page body in process memory behind a mutex. Useful for tests
/// and for running the cache without a remote store; all data is lost on
/// process restart. Fetch and store counters expose how many backend calls a
/// higher-level operation performed.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
    fetches: Arc<AtomicUsize>,
    stores: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw page body directly, bypassing the paginated save path.
    pub async fn insert_raw(&self, key: impl Into<String>, body: PageBody) {
        let mut inner = self.inner.lock().await;
        inner.pages.insert(key.into(), body);
    }

    /// Returns the stored body for `key`, if any.
    pub async fn page(&self, key: &str) -> Option<PageBody> {
        let inner = self.inner.lock().await;
        inner.pages.get(key).cloned()
    }

    /// Returns the number of stored pages.
    pub async fn page_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.pages.len()
    }

    /// Returns how many page fetches have been served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Returns how many page stores have been served.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::Relaxed)
    }
}

impl PageBackend for MemoryBackend {
    async fn fetch_page(&self, key: String) -> DedupResult<PageBody> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let inner = self.inner.lock().await;
        match inner.pages.get(&key) {
            Some(body) => Ok(body.clone()),
            None => bail!(
                ErrorKind::TransportError,
                "Remote store request failed",
                detail = format!("no value stored under key `{key}`")
            ),
        }
    }

    async fn store_page(&self, key: String, body: PageBody) -> DedupResult<PageBody> {
        self.stores.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock().await;
        inner.pages.insert(key, body.clone());
        Ok(body)
    }
}
