// hasher.rs: SHA-256 helpers, hex-encoded.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Digest of a JSON value in its compact serialized form.
///
/// `serde_json::Value` keeps object keys sorted, so equal values hash equally
/// regardless of the key order the caller sent.
pub fn hash_json(value: &serde_json::Value) -> String {
    hash_str(&value.to_string())
}
