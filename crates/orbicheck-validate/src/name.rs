//! # Name Validator (§4.5 of the expanded spec)
//!
//! Format-only: the registry has no dedicated `name.*` reason-code category,
//! so failures surface through the general HTTP-layer `validation_error`
//! code rather than a `ReasonCode` variant.

const MIN_LEN: usize = 1;
const MAX_LEN: usize = 200;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NameValidationResult {
    pub valid: bool,
    pub normalized: String,
}

/// Validate a single name field (first name, last name, or a full name).
pub fn validate(raw: &str) -> NameValidationResult {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    let valid = (MIN_LEN..=MAX_LEN).contains(&len) && trimmed.chars().all(is_printable);
    NameValidationResult {
        valid,
        normalized: trimmed.to_string(),
    }
}

fn is_printable(c: char) -> bool {
    !c.is_control()
}
