//! Content-addressed snapshot keys.

use sha2::{Digest, Sha256};

/// Key for a page snapshot within one session: URL plus raw markup length.
///
/// Any re-fetch that changes the markup size yields a new key, so stale
/// snapshots are never reused after an interaction mutates the page.
pub fn snapshot_key(url: &str, raw_len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(raw_len.to_le_bytes());
    hex::encode(hasher.finalize())
}
