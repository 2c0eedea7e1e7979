//! SHA-256 helper for record-log chaining.

use crate::Hash32;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as a [`Hash32`].
pub fn sha256(bytes: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Hash32(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256(b"seal"), sha256(b"seal"));
        assert_ne!(sha256(b"seal"), sha256(b"seals"));
    }
}
