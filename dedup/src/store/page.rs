//! Wire codec for cache pages.
//!
//! A page travels as a flat JSON object: a boolean-true sentinel field marking
//! the key as belonging to this system, zero or more `records.<n>` fields whose
//! values are chunk strings, an integer `total` page count, and (on write) the
//! page's own 0-based `page` index.

use serde_json::Value;

use crate::bail;
use crate::error::{DedupResult, ErrorKind};
use crate::store::base::PageBody;

/// Sentinel field proving a stored value is a page of this system's data.
pub const SENTINEL_FIELD: &str = "__dedup_cache_page__";

/// Prefix of chunk fields; the suffix is the chunk's global index.
pub const RECORDS_FIELD_PREFIX: &str = "records.";

/// Field holding the total page count of the save the page belongs to.
pub const TOTAL_FIELD: &str = "total";

/// Field holding the page's own 0-based index, written but never read back.
pub const PAGE_FIELD: &str = "page";

/// Decoded form of one page: its chunk strings in chunk-index order, and the
/// total page count the writing save recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Chunk strings in ascending chunk-index order.
    pub records: Vec<String>,
    /// Total page count; only trusted on page 0.
    pub total: usize,
}

impl Page {
    /// Decodes a raw page body fetched from the store.
    ///
    /// Fails with [`ErrorKind::InvalidStoreKey`] when the sentinel is missing.
    /// Chunk fields are ordered by the numeric suffix of their names, never by
    /// the order in which the backend enumerates fields. A missing `total`
    /// decodes as zero; the loader only reads it from page 0.
    pub fn from_body(body: &PageBody) -> DedupResult<Page> {
        let tagged = body
            .get(SENTINEL_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !tagged {
            bail!(
                ErrorKind::InvalidStoreKey,
                "Fetched value is not a dedup cache page",
                "the derived key may be in use by something else, or the cache was never initialized"
            );
        }

        let mut indexed: Vec<(usize, String)> = Vec::new();
        for (field, value) in body {
            let Some(suffix) = field.strip_prefix(RECORDS_FIELD_PREFIX) else {
                continue;
            };
            let index: usize = suffix.parse()?;

            let Some(chunk) = value.as_str() else {
                bail!(
                    ErrorKind::InvalidData,
                    "Page chunk field holds a non-string value",
                    detail = format!("field `{field}` is not a string")
                );
            };
            indexed.push((index, chunk.to_string()));
        }
        indexed.sort_by_key(|(index, _)| *index);

        let total = body
            .get(TOTAL_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        Ok(Page {
            records: indexed.into_iter().map(|(_, chunk)| chunk).collect(),
            total,
        })
    }

    /// Encodes the page for writing to the store.
    ///
    /// `page_index` is this page's own index; `first_chunk_index` is the global
    /// index of its first chunk, since chunk numbering continues across pages.
    pub fn to_body(&self, page_index: usize, first_chunk_index: usize) -> PageBody {
        let mut body = PageBody::new();

        body.insert(SENTINEL_FIELD.to_string(), Value::Bool(true));
        for (offset, chunk) in self.records.iter().enumerate() {
            body.insert(
                format!("{RECORDS_FIELD_PREFIX}{}", first_chunk_index + offset),
                Value::String(chunk.clone()),
            );
        }
        body.insert(TOTAL_FIELD.to_string(), Value::from(self.total as u64));
        body.insert(PAGE_FIELD.to_string(), Value::from(page_index as u64));

        body
    }
}
