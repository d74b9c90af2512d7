//! Deterministic derivation of remote store keys for cache pages.

use uuid::Uuid;

/// Derives the remote store key addressing one page of an owner's cache.
///
/// The key is a UUID v5 over the OID namespace of `"{owner_id}.{page}"`,
/// rendered as a hyphenated lowercase string. The derivation is stable across
/// processes and versions; the remote store is addressed solely by this key,
/// so changing it would orphan all persisted state.
pub fn derive_page_key(owner_id: &str, page: usize) -> String {
    let partition = format!("{owner_id}.{page}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, partition.as_bytes()).to_string()
}
