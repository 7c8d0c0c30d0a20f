//! # orbicheck-crypto — Cryptographic Primitives
//!
//! SHA-256 digests, HMAC-SHA256 signing/verification, timing-safe
//! comparison, API-key hashing, and PAT hashing with a pepper. Every
//! other crate that needs one of these goes through here rather than
//! reaching for `sha2`/`hmac` directly — this is the only sanctioned
//! path.

pub mod api_key;
pub mod error;
pub mod hmac_sign;
pub mod pat;
pub mod sha256;

pub use error::CryptoError;
