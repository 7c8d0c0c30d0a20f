//! # Error Hierarchy
//!
//! Domain-level errors shared across crates. HTTP mapping lives in
//! `orbicheck-api::error` (§7 — the API layer never exposes these
//! messages verbatim for internal failures).

use thiserror::Error;

/// Errors raised while constructing or validating domain primitives
/// (identifiers, normalized values). Distinct from validator *results*
/// (§4 — a validator returning `valid: false` is not an error, it is a
/// successful evaluation with a negative outcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty input")]
    Empty,

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("unknown tax id type: {0}")]
    UnknownTaxIdType(String),
}

/// Top-level domain error used by orchestration crates (dedupe, rules,
/// orders) for failures that are not validator outcomes — e.g. a tenant
/// reference that cannot be resolved, or a duplicate order id collision
/// at the repository layer.
#[derive(Error, Debug)]
pub enum OrbiError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrbiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}
