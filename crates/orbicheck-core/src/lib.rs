//! # orbicheck-core — Foundational Types
//!
//! Tenant/identifier newtypes, the closed [`reason_code::ReasonCode`]
//! registry, the structured [`error::OrbiError`] hierarchy, and
//! canonical-JSON digest helpers shared by every other crate in the
//! workspace.

pub mod error;
pub mod ids;
pub mod digest;
pub mod reason_code;

pub use error::{OrbiError, ValidationError};
pub use ids::{ProjectId, RequestId, TenantScoped};
pub use reason_code::{dedup_preserve_order, ReasonCategory, ReasonCode, ReasonSeverity};
