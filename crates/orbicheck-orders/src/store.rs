//! # Persistence Traits + In-Memory Defaults
//!
//! The order evaluator never reaches sqlx directly — it depends on these
//! traits so `orbicheck-api` can supply a Postgres-backed implementation
//! when `DATABASE_URL` is configured, and fall back to the in-memory ones
//! here otherwise (§9.4). Every method is scoped by a [`TenantScoped`]
//! marker rather than a bare `&str` so a caller can't pass an unrelated
//! identifier where a tenant scope is required (§3 Data Model).

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use orbicheck_core::TenantScoped;
use orbicheck_dedupe::{AddressRecord, CustomerRecord};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn exists(&self, tenant: TenantScoped<'_>, order_id: &str) -> bool;
    async fn insert(&self, tenant: TenantScoped<'_>, order_id: &str);
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<CustomerRecord>;
    /// Insert a new record if `normalized_email`/`normalized_phone` aren't
    /// already present verbatim, returning the canonical id either way.
    async fn upsert(&self, tenant: TenantScoped<'_>, record: CustomerRecord) -> String;
    /// Drop every record in `merged_ids` (`canonical_id` must not be among
    /// them), simulating the foreign-key re-point a real repository would
    /// perform in a single transaction (§5/Decision D2).
    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]);
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<AddressRecord>;
    async fn upsert(&self, tenant: TenantScoped<'_>, record: AddressRecord) -> String;
    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]);
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<(String, String), ()>,
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn exists(&self, tenant: TenantScoped<'_>, order_id: &str) -> bool {
        self.orders.contains_key(&(tenant.as_str().to_string(), order_id.to_string()))
    }

    async fn insert(&self, tenant: TenantScoped<'_>, order_id: &str) {
        self.orders.insert((tenant.as_str().to_string(), order_id.to_string()), ());
    }
}

#[derive(Default)]
pub struct InMemoryCustomerStore {
    by_project: DashMap<String, Vec<CustomerRecord>>,
    next_id: AtomicI64,
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<CustomerRecord> {
        self.by_project.get(tenant.as_str()).map(|v| v.clone()).unwrap_or_default()
    }

    async fn upsert(&self, tenant: TenantScoped<'_>, mut record: CustomerRecord) -> String {
        let mut entry = self.by_project.entry(tenant.as_str().to_string()).or_default();
        if let Some(existing) = entry.iter().find(|r| {
            (record.normalized_email.is_some() && r.normalized_email == record.normalized_email)
                || (record.normalized_phone.is_some() && r.normalized_phone == record.normalized_phone)
        }) {
            return existing.id.clone();
        }
        let id = format!("cust_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        record.id = id.clone();
        entry.push(record);
        id
    }

    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]) {
        if let Some(mut entry) = self.by_project.get_mut(tenant.as_str()) {
            entry.retain(|r| r.id == canonical_id || !merged_ids.contains(&r.id));
        }
    }
}

#[derive(Default)]
pub struct InMemoryAddressStore {
    by_project: DashMap<String, Vec<AddressRecord>>,
    next_id: AtomicI64,
}

#[async_trait]
impl AddressStore for InMemoryAddressStore {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<AddressRecord> {
        self.by_project.get(tenant.as_str()).map(|v| v.clone()).unwrap_or_default()
    }

    async fn upsert(&self, tenant: TenantScoped<'_>, mut record: AddressRecord) -> String {
        let mut entry = self.by_project.entry(tenant.as_str().to_string()).or_default();
        if let Some(existing) = entry.iter().find(|r| r.address_hash == record.address_hash) {
            return existing.id.clone();
        }
        let id = format!("addr_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        record.id = id.clone();
        entry.push(record);
        id
    }

    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]) {
        if let Some(mut entry) = self.by_project.get_mut(tenant.as_str()) {
            entry.retain(|r| r.id == canonical_id || !merged_ids.contains(&r.id));
        }
    }
}
