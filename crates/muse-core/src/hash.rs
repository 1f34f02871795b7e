use sha2::{Digest, Sha256};

/// Stable identifier for a diff, logged in place of its contents.
pub fn diff_hash(diff: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(diff.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
