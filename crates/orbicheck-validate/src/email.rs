//! # Email Validator (§4.2)

use std::sync::Arc;

use orbicheck_cache::Cache;
use orbicheck_core::ReasonCode;
use sha1::{Digest, Sha1};

use crate::collaborators::DnsResolver;

const DOMAIN_FACTS_TTL_DAYS: i64 = 7;
const FULL_RESULT_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmailValidationResult {
    pub valid: bool,
    pub normalized: String,
    pub disposable: bool,
    pub mx_found: bool,
    pub reason_codes: Vec<ReasonCode>,
    pub ttl_seconds: i64,
    /// Overwritten by the route handler with the per-request id; never
    /// trust a cached value here since a cache hit would otherwise replay
    /// a stale id (§4.2).
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct DomainFacts {
    mx_found: bool,
    disposable: bool,
}

pub struct EmailValidator {
    cache: Arc<dyn Cache>,
    dns: Arc<dyn DnsResolver>,
    disposable_domains: Arc<orbicheck_cache::DisposableDomainSet>,
}

impl EmailValidator {
    pub fn new(
        cache: Arc<dyn Cache>,
        dns: Arc<dyn DnsResolver>,
        disposable_domains: Arc<orbicheck_cache::DisposableDomainSet>,
    ) -> Self {
        Self {
            cache,
            dns,
            disposable_domains,
        }
    }

    pub async fn validate(&self, raw: &str) -> EmailValidationResult {
        let normalized = match normalize(raw) {
            Ok(normalized) => normalized,
            Err(()) => {
                // IDNA rejected the domain outright — a transient resolver
                // hiccup looks the same as a malformed domain from here, so
                // this is treated as a server error rather than silently
                // falling back to the raw (non-ASCII) domain, and the
                // result is never cached since the failure may not recur.
                return EmailValidationResult {
                    valid: false,
                    normalized: raw.trim().to_lowercase(),
                    disposable: false,
                    mx_found: false,
                    reason_codes: vec![ReasonCode::EmailServerError],
                    ttl_seconds: 0,
                    request_id: String::new(),
                };
            }
        };
        if normalized.is_empty() {
            return EmailValidationResult {
                valid: false,
                normalized: String::new(),
                disposable: false,
                mx_found: false,
                reason_codes: vec![ReasonCode::EmailInvalidFormat],
                ttl_seconds: 0,
                request_id: String::new(),
            };
        }

        let cache_key = format!("validator:email:{}", sha1_hex(&normalized));
        if let Some(cached) = self.cache.get(&cache_key) {
            if let Ok(result) = serde_json::from_str::<EmailValidationResult>(&cached) {
                return result;
            }
        }

        let Some((_local, domain)) = split_syntactic(&normalized) else {
            return EmailValidationResult {
                valid: false,
                normalized,
                disposable: false,
                mx_found: false,
                reason_codes: vec![ReasonCode::EmailInvalidFormat],
                ttl_seconds: 0,
                request_id: String::new(),
            };
        };

        let domain_key = format!("domain:{domain}");
        let facts = match self.cache.get(&domain_key) {
            Some(cached) => serde_json::from_str::<DomainFacts>(&cached).unwrap_or_else(|_| DomainFacts {
                mx_found: false,
                disposable: false,
            }),
            None => {
                let mx_found = self.dns.mx_found(&domain).await;
                let disposable = self.disposable_domains.contains(&domain);
                let facts = DomainFacts { mx_found, disposable };
                if let Ok(json) = serde_json::to_string(&facts) {
                    self.cache
                        .set(&domain_key, json, chrono::Duration::days(DOMAIN_FACTS_TTL_DAYS));
                }
                facts
            }
        };

        let mut reason_codes = Vec::new();
        if !facts.mx_found {
            reason_codes.push(ReasonCode::EmailMxNotFound);
        }
        if facts.disposable {
            reason_codes.push(ReasonCode::EmailDisposableDomain);
        }

        let valid = facts.mx_found && !facts.disposable;
        let result = EmailValidationResult {
            valid,
            normalized,
            disposable: facts.disposable,
            mx_found: facts.mx_found,
            reason_codes: orbicheck_core::dedup_preserve_order(reason_codes),
            ttl_seconds: FULL_RESULT_TTL_DAYS * 86_400,
            request_id: String::new(),
        };

        if let Ok(json) = serde_json::to_string(&result) {
            self.cache
                .set(&cache_key, json, chrono::Duration::days(FULL_RESULT_TTL_DAYS));
        }

        result
    }
}

/// Lowercase and IDNA-normalize the domain half of `raw`. `Err(())` means
/// IDNA rejected the domain outright — callers must not fall back to the
/// raw domain in that case (§4.2 step 7: `email.server_error`, uncached).
fn normalize(raw: &str) -> Result<String, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let Some((local, domain)) = trimmed.rsplit_once('@') else {
        return Ok(trimmed.to_lowercase());
    };
    let ascii_domain = idna::domain_to_ascii(domain).map_err(|_| ())?;
    Ok(format!("{}@{}", local, ascii_domain).to_lowercase())
}

fn split_syntactic(normalized: &str) -> Option<(String, String)> {
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    if local.contains(' ') || domain.contains(' ') {
        return None;
    }
    Some((local.to_string(), domain.to_string()))
}

fn sha1_hex(value: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbicheck_cache::InMemoryCache;

    struct AlwaysFound;
    #[async_trait::async_trait]
    impl DnsResolver for AlwaysFound {
        async fn mx_found(&self, _domain: &str) -> bool {
            true
        }
    }

    struct NeverFound;
    #[async_trait::async_trait]
    impl DnsResolver for NeverFound {
        async fn mx_found(&self, _domain: &str) -> bool {
            false
        }
    }

    fn validator(dns: Arc<dyn DnsResolver>) -> EmailValidator {
        EmailValidator::new(
            Arc::new(InMemoryCache::new()),
            dns,
            Arc::new(orbicheck_cache::DisposableDomainSet::new(
                ["mailinator.com".to_string()].into(),
            )),
        )
    }

    #[tokio::test]
    async fn empty_input_fails_fast() {
        let result = validator(Arc::new(AlwaysFound)).validate("").await;
        assert!(!result.valid);
        assert_eq!(result.normalized, "");
        assert_eq!(result.reason_codes, vec![ReasonCode::EmailInvalidFormat]);
    }

    #[tokio::test]
    async fn malformed_address_fails_syntactic_check() {
        let result = validator(Arc::new(AlwaysFound)).validate("not-an-email").await;
        assert!(!result.valid);
        assert_eq!(result.reason_codes, vec![ReasonCode::EmailInvalidFormat]);
    }

    #[tokio::test]
    async fn valid_address_with_mx_passes() {
        let result = validator(Arc::new(AlwaysFound)).validate("User@Example.COM").await;
        assert!(result.valid);
        assert_eq!(result.normalized, "user@example.com");
        assert!(result.reason_codes.is_empty());
    }

    #[tokio::test]
    async fn missing_mx_fails_with_reason_code() {
        let result = validator(Arc::new(NeverFound)).validate("user@example.com").await;
        assert!(!result.valid);
        assert_eq!(result.reason_codes, vec![ReasonCode::EmailMxNotFound]);
    }

    #[tokio::test]
    async fn disposable_domain_forces_invalid() {
        let result = validator(Arc::new(AlwaysFound)).validate("user@mailinator.com").await;
        assert!(!result.valid);
        assert!(result.disposable);
        assert_eq!(result.reason_codes, vec![ReasonCode::EmailDisposableDomain]);
    }

    #[tokio::test]
    async fn invalid_idna_domain_is_a_server_error_and_is_not_cached() {
        let v = validator(Arc::new(AlwaysFound));
        let result = v.validate("user@xn--").await;
        assert!(!result.valid);
        assert_eq!(result.reason_codes, vec![ReasonCode::EmailServerError]);
        let cache_key = format!("validator:email:{}", sha1_hex("user@xn--"));
        assert!(v.cache.get(&cache_key).is_none());
    }

    #[tokio::test]
    async fn second_call_hits_full_result_cache() {
        let v = validator(Arc::new(AlwaysFound));
        let first = v.validate("user@example.com").await;
        let second = v.validate("user@example.com").await;
        assert_eq!(first.valid, second.valid);
        assert_eq!(first.normalized, second.normalized);
    }
}
