//! Fixed-length chunking of encoded cache blobs.

use crate::bail;
use crate::error::{DedupResult, ErrorKind};

/// Splits a string into consecutive chunks of at most `size` characters.
///
/// The final chunk may be shorter than `size`. An empty input yields an empty
/// sequence. Fails with [`ErrorKind::InvalidArgument`] when `size` is zero.
///
/// Chunk boundaries are byte offsets; the encoded blobs passed through here are
/// base64 text, so bytes and characters coincide. A boundary that falls inside
/// a multi-byte character is rejected rather than corrupting the text.
pub fn split_into_chunks(input: &str, size: usize) -> DedupResult<Vec<String>> {
    if size == 0 {
        bail!(
            ErrorKind::InvalidArgument,
            "Chunk size must be greater than zero"
        );
    }

    let mut chunks = Vec::with_capacity(input.len().div_ceil(size));
    for part in input.as_bytes().chunks(size) {
        chunks.push(std::str::from_utf8(part)?.to_string());
    }

    Ok(chunks)
}

/// Concatenates chunks back into the original string.
///
/// This is the exact inverse of [`split_into_chunks`] provided chunk order
/// round-trips through storage unchanged.
pub fn join_chunks<I, S>(chunks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for chunk in chunks {
        joined.push_str(chunk.as_ref());
    }
    joined
}
