//! Content hashing.
//!
//! Manifests record the SHA-256 of a file's *uncompressed* contents as a
//! lowercase hex string; this module is the single place that computation
//! happens so the digest format can't drift between the builder and the
//! planner/applier.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of `contents`.
#[must_use]
pub fn sha256_hex(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn differs_for_differing_input() {
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }
}
