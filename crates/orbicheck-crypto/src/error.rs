//! # Cryptographic Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("HMAC verification failed")]
    HmacVerificationFailed,

    #[error("invalid HMAC key length")]
    InvalidKeyLength,

    #[error("hex decode error: {0}")]
    HexDecode(String),

    #[error("password hash error: {0}")]
    PasswordHash(String),
}
