//! Content hashing of polled records.
//!
//! The hash fingerprints a record's full structural content: two records with
//! the same fields and values hash identically no matter the order in which
//! the fields were populated. Hash equality is treated as "no change", so a
//! digest collision is tolerated as a false negative.

use base64::{Engine, prelude::BASE64_STANDARD};
use md5::{Digest, Md5};
use serde_json::Value;

use crate::types::{PollRecord, RecordId};

/// Computes the content hash of a record.
///
/// The digest covers the id and every field, canonicalized recursively, and is
/// returned as standard base64 of the 16-byte MD5 output (24 characters).
/// Deterministic across process runs.
pub fn hash_record(record: &PollRecord) -> String {
    let mut hasher = Md5::new();

    match &record.id {
        RecordId::Integer(id) => {
            hasher.update(b"n");
            hasher.update(id.to_string().as_bytes());
        }
        RecordId::Text(id) => update_str(&mut hasher, id),
    }

    update_object(&mut hasher, &record.fields);

    BASE64_STANDARD.encode(hasher.finalize())
}

/// Feeds a JSON value into the digest in a canonical, type-tagged form.
///
/// Each value is prefixed with a one-byte type tag and strings carry their
/// length, so structurally different values can never produce the same byte
/// stream. Object keys are visited in sorted order regardless of how the map
/// iterates.
fn update_value(hasher: &mut Md5, value: &Value) {
    match value {
        Value::Null => hasher.update(b"z"),
        Value::Bool(flag) => {
            hasher.update(b"b");
            hasher.update(&[*flag as u8]);
        }
        Value::Number(number) => {
            hasher.update(b"n");
            hasher.update(number.to_string().as_bytes());
        }
        Value::String(text) => update_str(hasher, text),
        Value::Array(items) => {
            hasher.update(b"a");
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                update_value(hasher, item);
            }
        }
        Value::Object(fields) => update_object(hasher, fields),
    }
}

fn update_object(hasher: &mut Md5, fields: &serde_json::Map<String, Value>) {
    hasher.update(b"o");
    hasher.update((fields.len() as u64).to_le_bytes());

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    for key in keys {
        update_str(hasher, key);
        // Key is guaranteed present, it was just collected from the map.
        if let Some(value) = fields.get(key) {
            update_value(hasher, value);
        }
    }
}

fn update_str(hasher: &mut Md5, text: &str) {
    hasher.update(b"s");
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}
