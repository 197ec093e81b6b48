//! Request key generation.
//!
//! Stores are keyed by a normalized request descriptor. The method is always
//! read as GET and the URL fragment never takes part in matching.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the store key for a request URL.
pub fn compute_request_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(b"GET");
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
