//! Request-keyed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the partition key for a request.
///
/// Methods are compared case-insensitively; the URL is used verbatim, so
/// callers canonicalise it (fragment stripped, query kept) beforehand.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
