//! Paginated persistence of a cache map through a page backend.
//!
//! A cache map of arbitrary size is serialized to JSON, base64-encoded, split
//! into bounded chunks, and grouped into bounded pages, so it fits a store
//! that only offers fixed-size named string slots. Loading reverses the
//! pipeline and must reproduce the encoded blob byte-exactly.

use base64::{Engine, prelude::BASE64_STANDARD};
use futures::future::try_join_all;
use tracing::debug;

use crate::chunk::{join_chunks, split_into_chunks};
use crate::config::PageLimits;
use crate::dedup_error;
use crate::error::{DedupResult, ErrorKind};
use crate::keys::derive_page_key;
use crate::store::base::{CacheStore, PageBackend, PageBody};
use crate::store::page::Page;
use crate::types::CacheMap;

/// Chunked, paginated [`CacheStore`] over an abstract [`PageBackend`].
///
/// Each instance owns one owner id's slice of the remote key space. Pages are
/// transient: nothing is cached across calls, every save rebuilds the full
/// blob and every load reassembles it from scratch. Concurrent savers for the
/// same owner are not coordinated; the last writer wins.
#[derive(Debug, Clone)]
pub struct PaginatedStore<B> {
    backend: B,
    owner_id: String,
    limits: PageLimits,
}

impl<B> PaginatedStore<B>
where
    B: PageBackend,
{
    /// Creates a store for `owner_id` with the default page limits.
    pub fn new(backend: B, owner_id: impl Into<String>) -> Self {
        Self {
            backend,
            owner_id: owner_id.into(),
            limits: PageLimits::default(),
        }
    }

    /// Creates a store with deployment-specific page limits.
    ///
    /// Fails with [`ErrorKind::InvalidArgument`] before any I/O when the
    /// limits are malformed.
    pub fn with_limits(
        backend: B,
        owner_id: impl Into<String>,
        limits: PageLimits,
    ) -> DedupResult<Self> {
        limits.validate()?;

        Ok(Self {
            backend,
            owner_id: owner_id.into(),
            limits,
        })
    }

    /// Fetches and decodes the page at `index`.
    async fn fetch_page(&self, index: usize) -> DedupResult<Page> {
        let key = derive_page_key(&self.owner_id, index);
        let body = self.backend.fetch_page(key).await?;
        Page::from_body(&body)
    }

    /// Builds the wire bodies for a save, keyed by derived page key.
    ///
    /// Chunks are grouped into pages of at most `max_keys_per_page`, with
    /// chunk indices continuing across page boundaries. An empty cache still
    /// produces one page with no chunk fields, so `total` is always at least 1
    /// and a later load finds a valid page 0.
    fn build_pages(&self, chunks: Vec<String>) -> Vec<(String, PageBody)> {
        let mut groups: Vec<&[String]> = chunks.chunks(self.limits.max_keys_per_page).collect();
        if groups.is_empty() {
            groups.push(&[]);
        }
        let total = groups.len();

        let mut bodies = Vec::with_capacity(total);
        let mut first_chunk_index = 0;
        for (page_index, group) in groups.into_iter().enumerate() {
            let page = Page {
                records: group.to_vec(),
                total,
            };
            bodies.push((
                derive_page_key(&self.owner_id, page_index),
                page.to_body(page_index, first_chunk_index),
            ));
            first_chunk_index += group.len();
        }

        bodies
    }
}

impl<B> CacheStore for PaginatedStore<B>
where
    B: PageBackend,
{
    /// Loads and reassembles the full cache map.
    ///
    /// Page 0 is fetched first since it discloses the total page count; the
    /// remaining pages are then fetched concurrently as a single batch.
    /// Ordering is restored by page index, not completion order. Any failure
    /// to decode the reassembled blob surfaces as
    /// [`ErrorKind::CacheCorruption`], never as an empty cache.
    async fn load(&self) -> DedupResult<CacheMap> {
        let first = self.fetch_page(0).await?;
        let total = first.total;

        let mut pages = vec![first];
        if total > 1 {
            let rest = try_join_all((1..total).map(|index| self.fetch_page(index))).await?;
            pages.extend(rest);
        }

        let encoded = join_chunks(pages.iter().flat_map(|page| page.records.iter()));
        let decoded = BASE64_STANDARD.decode(encoded.as_bytes()).map_err(|err| {
            dedup_error!(
                ErrorKind::CacheCorruption,
                "Dedup cache seems to be corrupted",
                "reassembled blob is not valid base64",
                source: err
            )
        })?;
        let text = String::from_utf8(decoded).map_err(|err| {
            dedup_error!(
                ErrorKind::CacheCorruption,
                "Dedup cache seems to be corrupted",
                "decoded blob is not valid UTF-8",
                source: err
            )
        })?;
        let records: CacheMap = serde_json::from_str(&text).map_err(|err| {
            dedup_error!(
                ErrorKind::CacheCorruption,
                "Dedup cache seems to be corrupted",
                "decoded blob is not a valid JSON cache map",
                source: err
            )
        })?;

        debug!(
            owner_id = %self.owner_id,
            pages = total.max(1),
            records = records.len(),
            "loaded dedup cache"
        );

        Ok(records)
    }

    /// Encodes, chunks, paginates, and writes the full cache map.
    ///
    /// All page writes are dispatched together and awaited as one batch. A
    /// single failed write fails the whole save and may leave the store with a
    /// mix of old and new pages; no rollback is attempted.
    async fn save(&self, records: &CacheMap) -> DedupResult<()> {
        let text = serde_json::to_string(records)?;
        let encoded = BASE64_STANDARD.encode(text);
        let chunks = split_into_chunks(&encoded, self.limits.max_value_size)?;
        let pages = self.build_pages(chunks);
        let total = pages.len();

        try_join_all(
            pages
                .into_iter()
                .map(|(key, body)| self.backend.store_page(key, body)),
        )
        .await?;

        debug!(
            owner_id = %self.owner_id,
            pages = total,
            records = records.len(),
            "saved dedup cache"
        );

        Ok(())
    }
}
