//! # Event Log (§4.13)
//!
//! A structured, append-only record of things that happened: order
//! evaluations, and per Decision D2, dedupe merges. `orbicheck-api`'s
//! webhook dispatcher (§4.12) subscribes to the same event types. The
//! logs endpoint paginates by an opaque cursor over `(created_at, id)`
//! rather than exposing offsets.

use chrono::{DateTime, Utc};

use orbicheck_core::{ReasonCode, TenantScoped};

/// Default/maximum page size for `EventLog::list`. A caller asking for
/// more than `MAX_LOG_PAGE_SIZE` is silently clamped rather than rejected.
pub const DEFAULT_LOG_PAGE_SIZE: usize = 50;
pub const MAX_LOG_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OrderEvaluated,
    DedupeMerge,
    WebhookSendFailed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub endpoint: String,
    pub reason_codes: Vec<ReasonCode>,
    pub status: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Parameters for `EventLog::append`, grouped into one struct (rather than
/// six positional args) since every field is required and order-sensitive
/// positional args would be easy to transpose at the call site.
#[derive(Debug, Clone)]
pub struct EventAppend {
    pub event_type: EventType,
    pub endpoint: String,
    pub reason_codes: Vec<ReasonCode>,
    pub status: String,
    pub meta: serde_json::Value,
}

impl EventAppend {
    pub fn new(event_type: EventType, endpoint: impl Into<String>, status: impl Into<String>, meta: serde_json::Value) -> Self {
        Self {
            event_type,
            endpoint: endpoint.into(),
            reason_codes: Vec::new(),
            status: status.into(),
            meta,
        }
    }

    pub fn with_reason_codes(mut self, reason_codes: Vec<ReasonCode>) -> Self {
        self.reason_codes = reason_codes;
        self
    }
}

/// One page of `EventLog::list`, with an opaque `next_cursor` to pass back
/// for the following page. `None` means there is no further page.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogPage {
    pub records: Vec<EventRecord>,
    pub next_cursor: Option<String>,
}

/// Encode a `(created_at, id)` pair as the opaque cursor handed back to
/// clients. Hex rather than base64 — no base64 crate is pulled in anywhere
/// else in this workspace, and `hex` already is.
pub fn encode_cursor(created_at: DateTime<Utc>, id: &str) -> String {
    hex::encode(format!("{}|{id}", created_at.to_rfc3339()))
}

/// Decode a cursor produced by `encode_cursor`. Returns `None` for a
/// malformed or tampered cursor rather than erroring — callers treat an
/// undecodable cursor as "start from the beginning".
pub fn decode_cursor(cursor: &str) -> Option<(DateTime<Utc>, String)> {
    let bytes = hex::decode(cursor).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    let (ts, id) = raw.split_once('|')?;
    let created_at = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    Some((created_at, id.to_string()))
}

#[async_trait::async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, tenant: TenantScoped<'_>, event: EventAppend) -> EventRecord;
    /// List records in descending `created_at` order, starting strictly
    /// after `cursor` (when `Some`), capped at `limit` (clamped to
    /// `[1, MAX_LOG_PAGE_SIZE]`).
    async fn list(&self, tenant: TenantScoped<'_>, cursor: Option<&str>, limit: usize) -> LogPage;
    /// Delete a single record by id (when `Some`) or every record for the
    /// project (when `None`), per `/v1/data/logs[/:id]` (§4.13). Returns the
    /// number of records removed.
    async fn delete(&self, tenant: TenantScoped<'_>, id: Option<&str>) -> usize;
}

#[derive(Default)]
pub struct InMemoryEventLog {
    events: parking_lot::Mutex<Vec<EventRecord>>,
    next_id: std::sync::atomic::AtomicI64,
}

#[async_trait::async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, tenant: TenantScoped<'_>, event: EventAppend) -> EventRecord {
        let id = format!(
            "evt_{}",
            self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        );
        let record = EventRecord {
            id,
            project_id: tenant.as_str().to_string(),
            event_type: event.event_type,
            endpoint: event.endpoint,
            reason_codes: event.reason_codes,
            status: event.status,
            meta: event.meta,
            created_at: Utc::now(),
        };
        self.events.lock().push(record.clone());
        record
    }

    async fn list(&self, tenant: TenantScoped<'_>, cursor: Option<&str>, limit: usize) -> LogPage {
        let project_id = tenant.as_str();
        let limit = limit.clamp(1, MAX_LOG_PAGE_SIZE);
        let after = cursor.and_then(decode_cursor);

        let mut matching: Vec<EventRecord> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let start = match &after {
            Some((created_at, id)) => matching
                .iter()
                .position(|e| (e.created_at, &e.id) == (*created_at, id))
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        let page: Vec<EventRecord> = matching[start..].iter().take(limit).cloned().collect();
        let next_cursor = if start + page.len() < matching.len() {
            page.last().map(|last| encode_cursor(last.created_at, &last.id))
        } else {
            None
        };

        LogPage { records: page, next_cursor }
    }

    async fn delete(&self, tenant: TenantScoped<'_>, id: Option<&str>) -> usize {
        let project_id = tenant.as_str();
        let mut events = self.events.lock();
        let before = events.len();
        match id {
            Some(id) => events.retain(|e| !(e.project_id == project_id && e.id == id)),
            None => events.retain(|e| e.project_id != project_id),
        }
        before - events.len()
    }
}

impl InMemoryEventLog {
    pub fn all(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }
}
