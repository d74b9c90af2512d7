//! Storage traits for the dedup cache.

use std::future::Future;

use serde_json::{Map, Value};

use crate::error::DedupResult;
use crate::types::CacheMap;

/// Flat JSON object exchanged with the remote store for one page.
pub type PageBody = Map<String, Value>;

/// Trait for persisting and retrieving one owner's full cache map.
///
/// This is the only interface the [`crate::dedup::Deduper`] requires of its
/// storage collaborator. Implementations should surface failures rather than
/// falling back to an empty cache.
pub trait CacheStore {
    /// Fetches the full cache map from persistent storage.
    fn load(&self) -> impl Future<Output = DedupResult<CacheMap>> + Send;

    /// Persists the full cache map, replacing whatever was stored before.
    fn save(&self, records: &CacheMap) -> impl Future<Output = DedupResult<()>> + Send;
}

/// Trait for the remote key/value transport holding individual pages.
///
/// A backend only knows how to get and put named flat JSON values under a
/// derived key; pagination and encoding live above it in
/// [`crate::store::paginated::PaginatedStore`]. Implementations are expected
/// to be cheap to call concurrently, since a single load or save fans out into
/// one call per page.
pub trait PageBackend: Send + Sync {
    /// Fetches the raw page body stored under `key`.
    fn fetch_page(&self, key: String) -> impl Future<Output = DedupResult<PageBody>> + Send;

    /// Stores a raw page body under `key`, returning the remote acknowledgement.
    fn store_page(
        &self,
        key: String,
        body: PageBody,
    ) -> impl Future<Output = DedupResult<PageBody>> + Send;
}
