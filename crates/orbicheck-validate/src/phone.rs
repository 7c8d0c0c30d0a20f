//! # Phone Validator (§4.3)

use std::sync::Arc;

use orbicheck_core::ReasonCode;
use phonenumber::PhoneNumber;

use crate::collaborators::OtpProvider;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhoneValidationResult {
    pub valid: bool,
    pub e164: Option<String>,
    pub country: Option<String>,
    pub verification_id: Option<String>,
    pub reason_codes: Vec<ReasonCode>,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OtpCheckResult {
    pub valid: bool,
    pub reason_codes: Vec<ReasonCode>,
}

pub struct PhoneValidator {
    otp: Arc<dyn OtpProvider>,
}

impl PhoneValidator {
    pub fn new(otp: Arc<dyn OtpProvider>) -> Self {
        Self { otp }
    }

    pub async fn validate(&self, raw: &str, country_hint: Option<&str>, request_otp: bool) -> PhoneValidationResult {
        let parsed = parse(raw, country_hint);

        let Some(number) = parsed else {
            return PhoneValidationResult {
                valid: false,
                e164: None,
                country: None,
                verification_id: None,
                reason_codes: vec![reason_for_parse_failure(raw, country_hint)],
                request_id: String::new(),
            };
        };

        let e164 = number.format().mode(phonenumber::Mode::E164).to_string();
        let country = number.country().id().map(|c| c.as_ref().to_string());

        if !request_otp {
            return PhoneValidationResult {
                valid: true,
                e164: Some(e164),
                country,
                verification_id: None,
                reason_codes: Vec::new(),
                request_id: String::new(),
            };
        }

        match self.otp.send(&e164).await {
            Ok(verification_id) => PhoneValidationResult {
                valid: true,
                e164: Some(e164),
                country,
                verification_id: Some(verification_id),
                reason_codes: vec![ReasonCode::PhoneOtpSent],
                request_id: String::new(),
            },
            Err(err) => {
                tracing::warn!(error = %err, "OTP send failed");
                PhoneValidationResult {
                    valid: true,
                    e164: Some(e164),
                    country,
                    verification_id: None,
                    reason_codes: vec![ReasonCode::PhoneOtpSendFailed],
                    request_id: String::new(),
                }
            }
        }
    }

    pub async fn verify_otp(&self, verification_id: &str, code: &str) -> OtpCheckResult {
        match self.otp.check(verification_id, code).await {
            Ok(true) => OtpCheckResult {
                valid: true,
                reason_codes: Vec::new(),
            },
            Ok(false) | Err(_) => OtpCheckResult {
                valid: false,
                reason_codes: vec![ReasonCode::PhoneOtpInvalid],
            },
        }
    }
}

fn parse(raw: &str, country_hint: Option<&str>) -> Option<PhoneNumber> {
    let country = country_hint.and_then(|c| c.parse::<phonenumber::country::Id>().ok());
    phonenumber::parse(country, raw).ok()
}

fn reason_for_parse_failure(raw: &str, country_hint: Option<&str>) -> ReasonCode {
    if raw.trim().is_empty() {
        return ReasonCode::PhoneInvalidFormat;
    }
    let has_digits = raw.chars().any(|c| c.is_ascii_digit());
    if !has_digits {
        ReasonCode::PhoneInvalidFormat
    } else if country_hint.is_none() && !raw.trim_start().starts_with('+') {
        ReasonCode::PhoneUnparseable
    } else {
        ReasonCode::PhoneInvalidFormat
    }
}
