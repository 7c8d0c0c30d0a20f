//! # Personal Access Token Hashing
//!
//! PATs (§3 Credential — *PAT* variant) are hashed with a strong password
//! hash and an application-wide pepper, unlike API keys which are
//! high-entropy random tokens hashed with plain SHA-256 (§3). The pepper
//! is an operator secret (`ENCRYPTION_KEY`-adjacent config, §6) mixed into
//! every hash so a leaked database alone cannot be brute-forced offline.

use crate::error::CryptoError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

/// Hash a presented PAT secret together with the tenant-wide pepper.
pub fn hash_with_pepper(secret: &str, pepper: &str) -> Result<String, CryptoError> {
    let peppered = format!("{secret}{pepper}");
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(peppered.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Verify a presented PAT secret against a stored Argon2 hash.
pub fn verify_with_pepper(secret: &str, pepper: &str, stored_hash: &str) -> Result<bool, CryptoError> {
    let peppered = format!("{secret}{pepper}");
    let parsed = PasswordHash::new(stored_hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(peppered.as_bytes(), &parsed)
        .is_ok())
}
