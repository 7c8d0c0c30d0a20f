//! # SHA-256 Digest Computation
//!
//! The single sanctioned path for producing content digests in this
//! workspace — used for `address_hash` (§3) over `orbicheck_core::digest::canonical_json`
//! output, and for API-key hashing (§3 Credential).

use sha2::{Digest, Sha256};

/// Compute the lowercase-hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the raw 32-byte SHA-256 digest of `data`.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
