//! # HMAC-SHA256 Signing & Verification
//!
//! Used for the HMAC credential class (§4.9) and for signing webhook
//! delivery bodies (§4.12, `X-OrbiCheck-Signature: sha256=<hex>`).
//! Verification is always timing-safe (`subtle::ConstantTimeEq`) — never
//! compare signatures with `==`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute `HMAC-SHA256(key, message)`, hex-encoded.
pub fn sign_hex(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature against `message` using
/// `key`, in constant time with respect to the presented signature.
///
/// Returns `false` (not an error) for malformed hex — an attacker-supplied
/// signature that fails to decode is simply a non-matching signature.
pub fn verify_hex(key: &[u8], message: &[u8], presented_hex: &str) -> bool {
    let Ok(presented) = hex::decode(presented_hex) else {
        return false;
    };
    let expected = {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
        mac.update(message);
        mac.finalize().into_bytes()
    };
    if presented.len() != expected.len() {
        return false;
    }
    presented.ct_eq(&expected).into()
}

/// Build the canonical HMAC message for the request-signing credential
/// class (§4.9, §12/D3): `METHOD ∥ url ∥ ts ∥ nonce`, method uppercased.
pub fn canonical_request_message(method: &str, url: &str, ts: &str, nonce: &str) -> Vec<u8> {
    let mut msg = String::with_capacity(method.len() + url.len() + ts.len() + nonce.len());
    msg.push_str(&method.to_uppercase());
    msg.push_str(url);
    msg.push_str(ts);
    msg.push_str(nonce);
    msg.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrips() {
        let key = b"secret-key";
        let msg = b"payload";
        let sig = sign_hex(key, msg);
        assert!(verify_hex(key, msg, &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let sig = sign_hex(b"key-a", b"payload");
        assert!(!verify_hex(b"key-b", b"payload", &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let sig = sign_hex(b"key", b"payload");
        assert!(!verify_hex(b"key", b"tampered", &sig));
    }

    #[test]
    fn verify_rejects_malformed_hex() {
        assert!(!verify_hex(b"key", b"payload", "not-hex!!"));
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let sig = sign_hex(b"key", b"payload");
        assert!(!verify_hex(b"key", b"payload", &sig[..10]));
    }

    #[test]
    fn canonical_message_uppercases_method() {
        let msg = canonical_request_message("post", "/v1/orders/evaluate", "12345", "abc");
        assert_eq!(msg, b"POST/v1/orders/evaluate12345abc");
    }
}
