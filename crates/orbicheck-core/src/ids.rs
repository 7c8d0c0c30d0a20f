//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for identifiers threaded through every
//! request. Each identifier is a distinct type — a [`ProjectId`] cannot be
//! passed where a [`RequestId`] is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant (project) identifier. All per-customer data and limits are
/// scoped by this id — see `§3 Data Model` / `Tenant (Project)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Create a new random project identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID as a project identifier.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A per-request identifier. Every response carries one (§6) and it is
/// the correlation key for the event log (§4.13) and the idempotency
/// store (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A borrowed marker proving a `project_id` has been resolved from the
/// auth layer before it reaches a repository function. Repository traits
/// (`OrderStore`, `CustomerStore`, `AddressStore`, `EventLog`) take this
/// instead of a bare `&str` so a caller cannot accidentally pass an
/// unrelated string (a customer id, an order id) where a tenant scope is
/// required — the type alone documents the call site's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScoped<'a>(&'a str);

impl<'a> TenantScoped<'a> {
    pub fn new(project_id: &'a str) -> Self {
        Self(project_id)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl<'a> std::fmt::Display for TenantScoped<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_scoped_exposes_the_wrapped_str() {
        let tenant = TenantScoped::new("proj_1");
        assert_eq!(tenant.as_str(), "proj_1");
    }

    #[test]
    fn project_id_unique() {
        assert_ne!(ProjectId::new(), ProjectId::new());
    }

    #[test]
    fn project_id_from_uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        assert_eq!(*ProjectId::from_uuid(uuid).as_uuid(), uuid);
    }

    #[test]
    fn project_id_display_and_parse_roundtrip() {
        let id = ProjectId::new();
        let parsed: ProjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn project_id_serde_roundtrip() {
        let id = ProjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ProjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn request_id_default_is_random() {
        assert_ne!(RequestId::default(), RequestId::default());
    }
}
