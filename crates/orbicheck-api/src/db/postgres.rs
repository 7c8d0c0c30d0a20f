//! Postgres-backed implementations of the `orbicheck-orders` persistence
//! traits, used in place of the in-memory defaults when `DATABASE_URL` is
//! configured. Every query is parameterized and scoped by `project_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use orbicheck_core::{ReasonCode, TenantScoped};
use orbicheck_dedupe::{AddressRecord, CustomerRecord};
use orbicheck_orders::{
    AddressStore, CustomerStore, EventAppend, EventLog, EventRecord, EventType, LogPage, OrderStore,
    MAX_LOG_PAGE_SIZE,
};

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn exists(&self, tenant: TenantScoped<'_>, order_id: &str) -> bool {
        sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM orders WHERE project_id = $1 AND order_id = $2",
        )
        .bind(tenant.as_str())
        .bind(order_id)
        .fetch_one(&self.pool)
        .await
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    async fn insert(&self, tenant: TenantScoped<'_>, order_id: &str) {
        let _ = sqlx::query(
            "INSERT INTO orders (project_id, order_id) VALUES ($1, $2) \
             ON CONFLICT (project_id, order_id) DO NOTHING",
        )
        .bind(tenant.as_str())
        .bind(order_id)
        .execute(&self.pool)
        .await;
    }
}

pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<CustomerRecord> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT id, normalized_email, normalized_phone, first_name, last_name \
             FROM customers WHERE project_id = $1",
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(CustomerRow::into_record)
        .collect()
    }

    async fn upsert(&self, tenant: TenantScoped<'_>, record: CustomerRecord) -> String {
        if let Some(existing) = sqlx::query_scalar::<_, String>(
            "SELECT id FROM customers WHERE project_id = $1 \
             AND ((normalized_email IS NOT NULL AND normalized_email = $2) \
                  OR (normalized_phone IS NOT NULL AND normalized_phone = $3)) \
             LIMIT 1",
        )
        .bind(tenant.as_str())
        .bind(&record.normalized_email)
        .bind(&record.normalized_phone)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None)
        {
            return existing;
        }

        let id = format!("cust_{}", uuid::Uuid::new_v4());
        let _ = sqlx::query(
            "INSERT INTO customers (id, project_id, normalized_email, normalized_phone, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(&record.normalized_email)
        .bind(&record.normalized_phone)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .execute(&self.pool)
        .await;
        id
    }

    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]) {
        let _ = sqlx::query("DELETE FROM customers WHERE project_id = $1 AND id = ANY($2) AND id != $3")
            .bind(tenant.as_str())
            .bind(merged_ids)
            .bind(canonical_id)
            .execute(&self.pool)
            .await;
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: String,
    normalized_email: Option<String>,
    normalized_phone: Option<String>,
    first_name: String,
    last_name: String,
}

impl CustomerRow {
    fn into_record(self) -> CustomerRecord {
        CustomerRecord {
            id: self.id,
            normalized_email: self.normalized_email,
            normalized_phone: self.normalized_phone,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

pub struct PgAddressStore {
    pool: PgPool,
}

impl PgAddressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressStore for PgAddressStore {
    async fn list(&self, tenant: TenantScoped<'_>) -> Vec<AddressRecord> {
        sqlx::query_as::<_, AddressRow>(
            "SELECT id, address_hash, postal_code, city, country, line1 \
             FROM addresses WHERE project_id = $1",
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(AddressRow::into_record)
        .collect()
    }

    async fn upsert(&self, tenant: TenantScoped<'_>, record: AddressRecord) -> String {
        if let Some(existing) = sqlx::query_scalar::<_, String>(
            "SELECT id FROM addresses WHERE project_id = $1 AND address_hash = $2 LIMIT 1",
        )
        .bind(tenant.as_str())
        .bind(&record.address_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None)
        {
            return existing;
        }

        let id = format!("addr_{}", uuid::Uuid::new_v4());
        let _ = sqlx::query(
            "INSERT INTO addresses (id, project_id, address_hash, postal_code, city, country, line1) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(&record.address_hash)
        .bind(&record.postal_code)
        .bind(&record.city)
        .bind(&record.country)
        .bind(&record.line1)
        .execute(&self.pool)
        .await;
        id
    }

    async fn merge(&self, tenant: TenantScoped<'_>, canonical_id: &str, merged_ids: &[String]) {
        let _ = sqlx::query("DELETE FROM addresses WHERE project_id = $1 AND id = ANY($2) AND id != $3")
            .bind(tenant.as_str())
            .bind(merged_ids)
            .bind(canonical_id)
            .execute(&self.pool)
            .await;
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: String,
    address_hash: String,
    postal_code: String,
    city: String,
    country: String,
    line1: String,
}

impl AddressRow {
    fn into_record(self) -> AddressRecord {
        AddressRecord {
            id: self.id,
            address_hash: self.address_hash,
            postal_code: self.postal_code,
            city: self.city,
            country: self.country,
            line1: self.line1,
        }
    }
}

pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn event_type_str(event_type: EventType) -> &'static str {
    match event_type {
        EventType::OrderEvaluated => "order_evaluated",
        EventType::DedupeMerge => "dedupe_merge",
        EventType::WebhookSendFailed => "webhook_send_failed",
    }
}

fn event_type_from_str(raw: &str) -> EventType {
    match raw {
        "dedupe_merge" => EventType::DedupeMerge,
        "webhook_send_failed" => EventType::WebhookSendFailed,
        _ => EventType::OrderEvaluated,
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn append(&self, tenant: TenantScoped<'_>, event: EventAppend) -> EventRecord {
        let id = format!("evt_{}", uuid::Uuid::new_v4());
        let created_at = Utc::now();
        let reason_codes: Vec<String> = event.reason_codes.iter().map(|c| c.as_str().to_string()).collect();
        let _ = sqlx::query(
            "INSERT INTO logs (id, project_id, event_type, endpoint, reason_codes, status, meta, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(event_type_str(event.event_type))
        .bind(&event.endpoint)
        .bind(&reason_codes)
        .bind(&event.status)
        .bind(&event.meta)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        EventRecord {
            id,
            project_id: tenant.as_str().to_string(),
            event_type: event.event_type,
            endpoint: event.endpoint,
            reason_codes: event.reason_codes,
            status: event.status,
            meta: event.meta,
            created_at,
        }
    }

    async fn list(&self, tenant: TenantScoped<'_>, cursor: Option<&str>, limit: usize) -> LogPage {
        let limit = limit.clamp(1, MAX_LOG_PAGE_SIZE) as i64;
        let after = cursor.and_then(orbicheck_orders::decode_cursor);

        // Fetch one extra row to know whether a further page exists without
        // a second round trip.
        let rows: Vec<LogRow> = match &after {
            Some((created_at, id)) => {
                sqlx::query_as::<_, LogRow>(
                    "SELECT id, project_id, event_type, endpoint, reason_codes, status, meta, created_at \
                     FROM logs WHERE project_id = $1 AND (created_at, id) < ($2, $3) \
                     ORDER BY created_at DESC, id DESC LIMIT $4",
                )
                .bind(tenant.as_str())
                .bind(created_at)
                .bind(id)
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, LogRow>(
                    "SELECT id, project_id, event_type, endpoint, reason_codes, status, meta, created_at \
                     FROM logs WHERE project_id = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2",
                )
                .bind(tenant.as_str())
                .bind(limit + 1)
                .fetch_all(&self.pool)
                .await
            }
        }
        .unwrap_or_default();

        let has_more = rows.len() as i64 > limit;
        let records: Vec<EventRecord> = rows.into_iter().take(limit as usize).map(LogRow::into_record).collect();
        let next_cursor = if has_more {
            records.last().map(|r| orbicheck_orders::encode_cursor(r.created_at, &r.id))
        } else {
            None
        };

        LogPage { records, next_cursor }
    }

    async fn delete(&self, tenant: TenantScoped<'_>, id: Option<&str>) -> usize {
        let result = match id {
            Some(id) => sqlx::query("DELETE FROM logs WHERE project_id = $1 AND id = $2")
                .bind(tenant.as_str())
                .bind(id)
                .execute(&self.pool)
                .await,
            None => sqlx::query("DELETE FROM logs WHERE project_id = $1")
                .bind(tenant.as_str())
                .execute(&self.pool)
                .await,
        };
        result.map(|r| r.rows_affected() as usize).unwrap_or(0)
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    project_id: String,
    event_type: String,
    endpoint: String,
    reason_codes: Vec<String>,
    status: String,
    meta: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl LogRow {
    fn into_record(self) -> EventRecord {
        EventRecord {
            id: self.id,
            project_id: self.project_id,
            event_type: event_type_from_str(&self.event_type),
            endpoint: self.endpoint,
            reason_codes: self.reason_codes.iter().filter_map(|c| ReasonCode::from_str(c)).collect(),
            status: self.status,
            meta: self.meta,
            created_at: self.created_at,
        }
    }
}
