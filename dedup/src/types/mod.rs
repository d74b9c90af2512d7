//! Core data types for change detection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from record id to content hash.
///
/// This is both the persisted and the in-memory "seen" state of one cache
/// owner. Record ids are stored as strings regardless of their original type.
pub type CacheMap = BTreeMap<String, String>;

/// Identifier of a polled record, unique within one poll batch.
///
/// Callers supply either string or integer ids; both address the same key
/// space once rendered to a string for the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer record id.
    Integer(i64),
    /// String record id.
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Integer(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Integer(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

/// One semi-structured record from a poll batch.
///
/// A record has a required id and arbitrary additional fields. Records are
/// read-only inputs to the cache; they are hashed as a unit, never diffed
/// field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRecord {
    /// Record identifier, unique within the batch.
    pub id: RecordId,
    /// All remaining fields of the record.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PollRecord {
    /// Creates a record from an id and its remaining fields.
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a record from a JSON value, which must be an object with an `id`
    /// field that is a string or an integer.
    pub fn from_value(value: Value) -> crate::error::DedupResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// One detected change, carrying the record id and its freshly computed hash.
///
/// The hash is informational for the caller, who may feed it back through
/// [`crate::dedup::Deduper::persist_change_set`] without re-hashing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordChange {
    /// Id of the changed record.
    pub id: RecordId,
    /// Content hash computed for the record during diffing.
    pub hash: String,
}

/// Snapshot of changes detected by one `find_changes` call.
///
/// Ordering within `created` and `updated` follows input record order, and
/// `all` is `created` followed by `updated`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChangeSet {
    /// Records whose id was absent from the cache.
    pub created: Vec<RecordChange>,
    /// Records whose stored hash differs from the recomputed one.
    pub updated: Vec<RecordChange>,
    /// All changes, created first then updated.
    pub all: Vec<RecordChange>,
}

impl ChangeSet {
    /// Assembles a change set, deriving `all` from the two lists.
    pub fn new(created: Vec<RecordChange>, updated: Vec<RecordChange>) -> Self {
        let all = created.iter().chain(updated.iter()).cloned().collect();
        Self {
            created,
            updated,
            all,
        }
    }

    /// Returns true when no created or updated records were detected.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
