//! Change detection against a persisted hash cache.

use tracing::debug;

use crate::config::RemoteStoreConfig;
use crate::error::DedupResult;
use crate::hash::hash_record;
use crate::store::base::CacheStore;
use crate::store::http::HttpBackend;
use crate::store::paginated::PaginatedStore;
use crate::types::{CacheMap, ChangeSet, PollRecord, RecordChange};

/// Detects which polled records are new or changed since the last poll.
///
/// A [`Deduper`] holds an in-memory cache of record id to content hash, lazily
/// populated from its [`CacheStore`]. Diffing never mutates the cache; the
/// caller persists accepted changes explicitly, and the persisted and
/// in-memory views are reconciled through an explicit [`Deduper::load`].
///
/// One instance is meant to serve one caller at a time, typically for the
/// duration of a single poll. Two instances racing on the same owner's remote
/// keys are not coordinated; the last writer wins.
#[derive(Debug)]
pub struct Deduper<S> {
    store: S,
    cache: Option<CacheMap>,
}

impl Deduper<PaginatedStore<HttpBackend>> {
    /// Wires a deduper for `owner_id` against the remote HTTP store.
    pub fn for_owner(config: &RemoteStoreConfig, owner_id: impl Into<String>) -> DedupResult<Self> {
        let backend = HttpBackend::from_config(config);
        let store = PaginatedStore::with_limits(backend, owner_id, config.limits.clone())?;

        Ok(Self::new(store))
    }
}

impl<S> Deduper<S>
where
    S: CacheStore,
{
    /// Creates a deduper over the given store with an unset cache.
    pub fn new(store: S) -> Self {
        Self { store, cache: None }
    }

    /// Returns the in-memory cache, if one has been loaded.
    pub fn cache(&self) -> Option<&CacheMap> {
        self.cache.as_ref()
    }

    /// Unconditionally replaces the in-memory cache from the store.
    ///
    /// Any pending local view is dropped before the fetch, so a failed load
    /// leaves the cache unset and a later load or forced reload can recover.
    pub async fn load(&mut self) -> DedupResult<()> {
        self.cache = None;

        let cache = self.store.load().await?;
        debug!(records = cache.len(), "loaded dedup cache into memory");
        self.cache = Some(cache);

        Ok(())
    }

    /// Compares `records` against the cached hashes and classifies them.
    ///
    /// Loads the cache first when it is unset or `force_reload` is true;
    /// otherwise the already-loaded cache is reused without another store
    /// round trip. Records whose id is absent from the cache are created,
    /// records whose recomputed hash differs are updated, and unchanged
    /// records are omitted. Diffing is read-only: the emitted hashes are for
    /// the caller to persist once the changes have been acted on.
    pub async fn find_changes(
        &mut self,
        records: &[PollRecord],
        force_reload: bool,
    ) -> DedupResult<ChangeSet> {
        if self.cache.is_none() || force_reload {
            self.load().await?;
        }
        // Loaded just above unless it was already set.
        let cache = self.cache.as_ref().expect("cache is loaded");

        let mut created = Vec::new();
        let mut updated = Vec::new();
        for record in records {
            let hash = hash_record(record);

            match cache.get(&record.id.to_string()) {
                None => created.push(RecordChange {
                    id: record.id.clone(),
                    hash,
                }),
                Some(cached) if *cached != hash => updated.push(RecordChange {
                    id: record.id.clone(),
                    hash,
                }),
                Some(_) => {}
            }
        }

        Ok(ChangeSet::new(created, updated))
    }

    /// Hashes `records` and persists them merged on top of the current cache.
    pub async fn persist_changes(&self, records: &[PollRecord]) -> DedupResult<()> {
        self.persist_hashes(hash_records(records)).await
    }

    /// Persists already-detected changes without re-hashing their records.
    pub async fn persist_change_set(&self, changes: &ChangeSet) -> DedupResult<()> {
        let hashes = changes
            .all
            .iter()
            .map(|change| (change.id.to_string(), change.hash.clone()))
            .collect();

        self.persist_hashes(hashes).await
    }

    /// Merges pre-computed id to hash pairs on top of the in-memory cache and
    /// saves the result.
    ///
    /// New keys are added, existing keys overwritten, unrelated keys
    /// preserved. The in-memory cache field itself is left untouched; callers
    /// needing the merged view call [`Deduper::load`] afterwards.
    pub async fn persist_hashes(&self, hashes: CacheMap) -> DedupResult<()> {
        let mut merged = self.cache.clone().unwrap_or_default();
        merged.extend(hashes);

        self.store.save(&merged).await
    }

    /// Bootstraps the cache from `records`, ignoring any existing remote state.
    ///
    /// Intended to be called once, before any polling has occurred.
    pub async fn initialize(&self, records: &[PollRecord]) -> DedupResult<()> {
        self.store.save(&hash_records(records)).await
    }
}

/// Hashes a batch of records into a cache map.
fn hash_records(records: &[PollRecord]) -> CacheMap {
    records
        .iter()
        .map(|record| (record.id.to_string(), hash_record(record)))
        .collect()
}
