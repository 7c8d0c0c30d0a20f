//! # Injected External Collaborators
//!
//! The validators never reach out to the network directly; they depend on
//! these traits so tests can supply deterministic fakes and production can
//! wire up the real DNS/geocoder/OTP/VIES integrations. Default
//! implementations here are best-effort and meant for local/dev use.

use std::time::Duration;

use async_trait::async_trait;

const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Domain facts needed by the email validator (§4.2 step 4).
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Best-effort check for mail-exchange reachability. Implementations
    /// should fall back to A/AAAA when no MX record is found.
    async fn mx_found(&self, domain: &str) -> bool;
}

/// Best-effort DNS resolver using the async resolver built into `tokio`.
/// `tokio::net::lookup_host` only resolves A/AAAA, not MX records, so this
/// always takes the documented A/AAAA fallback path — a real deployment
/// should swap in an MX-aware resolver behind the same trait.
#[derive(Default)]
pub struct SystemDnsResolver;

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn mx_found(&self, domain: &str) -> bool {
        match tokio::time::timeout(DNS_LOOKUP_TIMEOUT, tokio::net::lookup_host((domain, 25))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(_)) | Err(_) => false,
        }
    }
}

/// Geocoding result for the address validator (§4.4 step 4).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, normalized_address: &serde_json::Value) -> Option<GeoPoint>;
}

/// Geocoder that never resolves anything — used when `GEOCODER_URL` is
/// unset (§9.3). Every lookup behaves like a provider outage, which the
/// address validator already treats as `address.geocode_failed`.
#[derive(Default)]
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    async fn geocode(&self, _normalized_address: &serde_json::Value) -> Option<GeoPoint> {
        None
    }
}

/// OTP dispatch for the phone validator (§4.3).
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Send a one-time code to `e164`, returning a verification id on success.
    async fn send(&self, e164: &str) -> Result<String, String>;
    /// Check a presented code against a previously issued verification id.
    async fn check(&self, verification_id: &str, code: &str) -> Result<bool, String>;
}

/// OTP provider with no real transport — always reports failure so the
/// validator takes the documented `phone.otp_send_failed` path rather than
/// silently fabricating a verification.
#[derive(Default)]
pub struct NullOtpProvider;

#[async_trait]
impl OtpProvider for NullOtpProvider {
    async fn send(&self, _e164: &str) -> Result<String, String> {
        Err("no OTP provider configured".to_string())
    }

    async fn check(&self, _verification_id: &str, _code: &str) -> Result<bool, String> {
        Err("no OTP provider configured".to_string())
    }
}

/// VIES-style VAT registry lookup for the tax-id validator (§4.5).
#[async_trait]
pub trait VatRegistry: Send + Sync {
    /// `Ok(Some(valid))` on a definitive answer, `Ok(None)`/`Err` on
    /// transport failure — best-effort per spec.
    async fn check_vat(&self, country: &str, number: &str) -> Result<Option<bool>, String>;
}

#[derive(Default)]
pub struct NullVatRegistry;

#[async_trait]
impl VatRegistry for NullVatRegistry {
    async fn check_vat(&self, _country: &str, _number: &str) -> Result<Option<bool>, String> {
        Err("no VAT registry configured".to_string())
    }
}

/// Per-tenant postal-code → expected-city reference table for the address
/// validator (§4.4 step 3).
#[async_trait]
pub trait PostalReferenceTable: Send + Sync {
    /// `None` means no reference data is held for this postal code —
    /// the validator treats that as non-fatal (§4.4).
    async fn expected_city(&self, country: &str, postal_code: &str) -> Option<String>;
}

/// Holds no reference data — every lookup is a miss, which the address
/// validator already treats as "do not flag" per spec.
#[derive(Default)]
pub struct EmptyPostalReferenceTable;

#[async_trait]
impl PostalReferenceTable for EmptyPostalReferenceTable {
    async fn expected_city(&self, _country: &str, _postal_code: &str) -> Option<String> {
        None
    }
}

/// Source of truth for the disposable-domain set (§4.2), consulted by the
/// refresher that feeds `orbicheck_cache::DisposableDomainSet::refresh`.
#[async_trait]
pub trait DisposableDomainSource: Send + Sync {
    async fn fetch(&self) -> Result<std::collections::HashSet<String>, String>;
}

/// Ships with a small built-in seed list so the validator behaves
/// sensibly with `DISPOSABLE_LIST_URL` unset, rather than flagging nothing.
#[derive(Default)]
pub struct SeedDisposableDomainSource;

#[async_trait]
impl DisposableDomainSource for SeedDisposableDomainSource {
    async fn fetch(&self) -> Result<std::collections::HashSet<String>, String> {
        Ok([
            "mailinator.com",
            "10minutemail.com",
            "tempmail.com",
            "guerrillamail.com",
            "yopmail.com",
        ]
        .into_iter()
        .map(String::from)
        .collect())
    }
}
