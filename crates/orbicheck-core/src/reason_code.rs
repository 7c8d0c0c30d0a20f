//! # Reason-Code Registry
//!
//! The closed catalogue of dotted `category.detail` codes emitted by
//! validators, the dedupe engine, and the order evaluator. Callers MUST
//! NOT invent new codes at call sites — every code returned to a client
//! is a variant of [`ReasonCode`], never a free-form string.
//!
//! ## Audit reference
//!
//! This single enum is the source of truth for the catalogue endpoint
//! (`GET /v1/rules/catalog/error-codes`). Adding a variant here is the
//! only way to introduce a new code anywhere in the service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping used by the catalogue endpoint and by dashboards outside this
/// service's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Email,
    Phone,
    Address,
    TaxId,
    Order,
    Dedupe,
    Webhook,
    Batch,
}

/// Severity, carried in the catalogue response; does not affect control
/// flow — a `high` severity code can still leave `valid: true` unset by
/// itself, severity is advisory metadata for downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSeverity {
    Low,
    Medium,
    High,
}

/// The closed set of reason codes. `Display` renders the dotted wire
/// form (`email.invalid_format`); `as_str` is the same thing without an
/// allocation at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    EmailInvalidFormat,
    EmailMxNotFound,
    EmailDisposableDomain,
    EmailServerError,

    PhoneInvalidFormat,
    PhoneUnparseable,
    PhoneOtpSent,
    PhoneOtpSendFailed,
    PhoneOtpInvalid,

    AddressPoBox,
    AddressPostalCityMismatch,
    AddressPostalReferenceUnknown,
    AddressGeocodeFailed,
    AddressGeoOutOfBounds,
    AddressInvalidFormat,

    TaxIdInvalidFormat,
    TaxIdInvalidChecksum,
    TaxIdViesInvalid,
    TaxIdViesUnavailable,

    OrderDuplicateDetected,
    OrderCustomerDedupeMatch,
    OrderAddressDedupeMatch,
    OrderDisposableEmail,
    OrderPoBoxBlock,
    OrderHighRiskRto,

    DedupeMergeWith,
    DedupeReview,
    DedupeCreateNew,

    WebhookSendFailed,
}

impl ReasonCode {
    /// All variants, in the stable order used by the catalogue endpoint.
    pub const ALL: &'static [ReasonCode] = &[
        Self::EmailInvalidFormat,
        Self::EmailMxNotFound,
        Self::EmailDisposableDomain,
        Self::EmailServerError,
        Self::PhoneInvalidFormat,
        Self::PhoneUnparseable,
        Self::PhoneOtpSent,
        Self::PhoneOtpSendFailed,
        Self::PhoneOtpInvalid,
        Self::AddressPoBox,
        Self::AddressPostalCityMismatch,
        Self::AddressPostalReferenceUnknown,
        Self::AddressGeocodeFailed,
        Self::AddressGeoOutOfBounds,
        Self::AddressInvalidFormat,
        Self::TaxIdInvalidFormat,
        Self::TaxIdInvalidChecksum,
        Self::TaxIdViesInvalid,
        Self::TaxIdViesUnavailable,
        Self::OrderDuplicateDetected,
        Self::OrderCustomerDedupeMatch,
        Self::OrderAddressDedupeMatch,
        Self::OrderDisposableEmail,
        Self::OrderPoBoxBlock,
        Self::OrderHighRiskRto,
        Self::DedupeMergeWith,
        Self::DedupeReview,
        Self::DedupeCreateNew,
        Self::WebhookSendFailed,
    ];

    pub fn category(self) -> ReasonCategory {
        use ReasonCode::*;
        match self {
            EmailInvalidFormat | EmailMxNotFound | EmailDisposableDomain | EmailServerError => {
                ReasonCategory::Email
            }
            PhoneInvalidFormat | PhoneUnparseable | PhoneOtpSent | PhoneOtpSendFailed
            | PhoneOtpInvalid => ReasonCategory::Phone,
            AddressPoBox
            | AddressPostalCityMismatch
            | AddressPostalReferenceUnknown
            | AddressGeocodeFailed
            | AddressGeoOutOfBounds
            | AddressInvalidFormat => ReasonCategory::Address,
            TaxIdInvalidFormat | TaxIdInvalidChecksum | TaxIdViesInvalid | TaxIdViesUnavailable => {
                ReasonCategory::TaxId
            }
            OrderDuplicateDetected
            | OrderCustomerDedupeMatch
            | OrderAddressDedupeMatch
            | OrderDisposableEmail
            | OrderPoBoxBlock
            | OrderHighRiskRto => ReasonCategory::Order,
            DedupeMergeWith | DedupeReview | DedupeCreateNew => ReasonCategory::Dedupe,
            WebhookSendFailed => ReasonCategory::Webhook,
        }
    }

    pub fn severity(self) -> ReasonSeverity {
        use ReasonCode::*;
        match self {
            AddressPostalReferenceUnknown | DedupeCreateNew => ReasonSeverity::Low,
            EmailServerError
            | EmailDisposableDomain
            | AddressGeoOutOfBounds
            | OrderHighRiskRto
            | WebhookSendFailed => ReasonSeverity::High,
            _ => ReasonSeverity::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        use ReasonCode::*;
        match self {
            EmailInvalidFormat => "email.invalid_format",
            EmailMxNotFound => "email.mx_not_found",
            EmailDisposableDomain => "email.disposable_domain",
            EmailServerError => "email.server_error",
            PhoneInvalidFormat => "phone.invalid_format",
            PhoneUnparseable => "phone.unparseable",
            PhoneOtpSent => "phone.otp_sent",
            PhoneOtpSendFailed => "phone.otp_send_failed",
            PhoneOtpInvalid => "phone.otp_invalid",
            AddressPoBox => "address.po_box",
            AddressPostalCityMismatch => "address.postal_city_mismatch",
            AddressPostalReferenceUnknown => "address.postal_reference_unknown",
            AddressGeocodeFailed => "address.geocode_failed",
            AddressGeoOutOfBounds => "address.geo_out_of_bounds",
            AddressInvalidFormat => "address.invalid_format",
            TaxIdInvalidFormat => "taxid.invalid_format",
            TaxIdInvalidChecksum => "taxid.invalid_checksum",
            TaxIdViesInvalid => "taxid.vies_invalid",
            TaxIdViesUnavailable => "taxid.vies_unavailable",
            OrderDuplicateDetected => "order.duplicate_detected",
            OrderCustomerDedupeMatch => "order.customer_dedupe_match",
            OrderAddressDedupeMatch => "order.address_dedupe_match",
            OrderDisposableEmail => "order.disposable_email",
            OrderPoBoxBlock => "order.po_box_block",
            OrderHighRiskRto => "order.high_risk_rto",
            DedupeMergeWith => "dedupe.merge_with",
            DedupeReview => "dedupe.review",
            DedupeCreateNew => "dedupe.create_new",
            WebhookSendFailed => "webhook.send_failed",
        }
    }

    /// Parse the dotted wire form produced by [`ReasonCode::as_str`] back
    /// into a variant. `None` for anything outside the closed set — a
    /// persisted reason code column should never hold anything else, but a
    /// stale deploy writing a since-removed code must not panic a reader.
    pub fn from_str(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.as_str() == raw)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// De-duplicate a list of reason codes, preserving first-occurrence order.
/// Required by every endpoint that aggregates codes from multiple stages
/// (§7, §4.11 final step).
pub fn dedup_preserve_order(codes: Vec<ReasonCode>) -> Vec<ReasonCode> {
    let mut seen = std::collections::HashSet::new();
    codes.into_iter().filter(|c| seen.insert(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_category_and_severity() {
        for code in ReasonCode::ALL {
            let _ = code.category();
            let _ = code.severity();
        }
    }

    #[test]
    fn wire_form_is_dotted() {
        assert_eq!(ReasonCode::EmailInvalidFormat.as_str(), "email.invalid_format");
        assert_eq!(ReasonCode::OrderHighRiskRto.as_str(), "order.high_risk_rto");
    }

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let codes = vec![
            ReasonCode::AddressPoBox,
            ReasonCode::AddressGeocodeFailed,
            ReasonCode::AddressPoBox,
        ];
        let deduped = dedup_preserve_order(codes);
        assert_eq!(
            deduped,
            vec![ReasonCode::AddressPoBox, ReasonCode::AddressGeocodeFailed]
        );
    }

    #[test]
    fn dedupe_codes_carry_the_dedupe_category() {
        assert_eq!(ReasonCode::DedupeMergeWith.category(), ReasonCategory::Dedupe);
        assert_eq!(ReasonCode::DedupeReview.category(), ReasonCategory::Dedupe);
        assert_eq!(ReasonCode::DedupeCreateNew.category(), ReasonCategory::Dedupe);
        assert_eq!(ReasonCode::DedupeMergeWith.as_str(), "dedupe.merge_with");
    }

    #[test]
    fn postal_reference_unknown_is_low_severity() {
        assert_eq!(
            ReasonCode::AddressPostalReferenceUnknown.severity(),
            ReasonSeverity::Low
        );
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ReasonCode::EmailMxNotFound).unwrap();
        assert_eq!(json, "\"email_mx_not_found\"");
    }
}
