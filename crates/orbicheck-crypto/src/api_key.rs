//! # API-Key Hashing
//!
//! API keys (§3 Credential — *API Key* variant) are opaque bearer tokens.
//! Only a SHA-256 hash of the full token is stored, indexed by a
//! 6-character prefix so lookups don't require scanning every hash.

use crate::sha256::sha256_hex;
use rand::RngCore;

/// Length of the random token body, before the `sk_live_` prefix.
const TOKEN_BYTES: usize = 32;

/// A freshly generated API key, returned to the caller exactly once.
/// Only `prefix` and `hash` are ever persisted.
pub struct GeneratedApiKey {
    /// The full secret token — show this to the caller once, never store it.
    pub token: String,
    /// First 6 characters of the token, used as a lookup index.
    pub prefix: String,
    /// SHA-256 hash of the full token, what actually gets stored.
    pub hash: String,
}

/// Generate a new API key token of the form `sk_live_<hex>`.
pub fn generate() -> GeneratedApiKey {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = format!("sk_live_{}", hex::encode(bytes));
    let prefix = token.chars().take(6).collect();
    let hash = sha256_hex(token.as_bytes());
    GeneratedApiKey { token, prefix, hash }
}

/// Hash a presented token the same way `generate` does, for comparison
/// against the stored `hash` column (§4.9: "compares SHA-256 of the
/// presented token against stored `hash`").
pub fn hash_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

/// Extract the lookup prefix from a presented token.
pub fn prefix_of(token: &str) -> String {
    token.chars().take(6).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_expected_shape() {
        let key = generate();
        assert!(key.token.starts_with("sk_live_"));
        assert_eq!(key.prefix.len(), 6);
        assert_eq!(key.hash.len(), 64);
    }

    #[test]
    fn hash_token_matches_generated_hash() {
        let key = generate();
        assert_eq!(hash_token(&key.token), key.hash);
    }

    #[test]
    fn hash_token_rejects_wrong_token() {
        let key = generate();
        assert_ne!(hash_token("sk_live_wrongvalue"), key.hash);
    }

    #[test]
    fn generate_produces_unique_tokens() {
        let a = generate();
        let b = generate();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn prefix_of_matches_generated_prefix() {
        let key = generate();
        assert_eq!(prefix_of(&key.token), key.prefix);
    }
}
