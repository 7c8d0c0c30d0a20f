//! # Webhook Dispatcher (§4.12, Decision D4)
//!
//! Best-effort, in-memory delivery: a background `tokio::spawn`'d loop
//! drains an in-process queue and POSTs each event to every subscription
//! that opted into its [`EventType`], signing the body with
//! `X-OrbiCheck-Signature: sha256=<hex>` (HMAC-SHA256 over the raw POST
//! body, keyed by the subscription secret). Retries with exponential
//! backoff up to `config.webhook_max_attempts`, capped so the last attempt
//! lands within roughly 30 minutes of the first. Failures append a
//! `webhook.send_failed` event to the originating project's log rather
//! than surfacing to any caller — nothing in this service blocks on
//! delivery.
//!
//! Actual HTTP delivery goes through the injected [`WebhookSink`] rather
//! than a `reqwest::Client` built inline, the same collaborator-injection
//! idiom `orbicheck-validate` uses for DNS/geocoding/OTP — tests supply a
//! fake sink instead of hitting the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orbicheck_core::TenantScoped;
use orbicheck_crypto::hmac_sign::sign_hex;
use orbicheck_orders::{EventAppend, EventLog, EventRecord, EventType, LogPage};

const BASE_DELAY_SECS: u64 = 30;
const MAX_DELAY_SECS: u64 = 30 * 60;
const SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a signed webhook POST somewhere. Swapped for a fake in tests so
/// retry/backoff logic can be exercised without a real network call.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Returns the response status code on a completed request, or `Err`
    /// for a transport-level failure (timeout, DNS, connection refused).
    async fn send(&self, url: &str, body: &[u8], signature_header: &str) -> Result<u16, String>;
}

/// Default sink backed by a real `reqwest::Client`.
pub struct ReqwestWebhookSink {
    client: reqwest::Client,
}

impl ReqwestWebhookSink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SINK_TIMEOUT)
                .build()
                .expect("reqwest client can be built"),
        }
    }
}

impl Default for ReqwestWebhookSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSink for ReqwestWebhookSink {
    async fn send(&self, url: &str, body: &[u8], signature_header: &str) -> Result<u16, String> {
        self.client
            .post(url)
            .header("X-OrbiCheck-Signature", signature_header)
            .header("content-type", "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|err| err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSubscription {
    pub id: String,
    pub project_id: String,
    pub url: String,
    pub secret: String,
    pub event_types: Vec<EventType>,
    pub enabled: bool,
}

/// Registry of webhook subscriptions. No route mutates this in the current
/// surface (webhook management UX is out of scope) — it exists so the
/// dispatcher has somewhere real to read subscriptions from once that
/// surface lands.
#[derive(Default)]
pub struct WebhookStore {
    subscriptions: parking_lot::RwLock<Vec<WebhookSubscription>>,
}

impl WebhookStore {
    pub fn register(&self, subscription: WebhookSubscription) {
        self.subscriptions.write().push(subscription);
    }

    fn matching(&self, project_id: &str, event_type: EventType) -> Vec<WebhookSubscription> {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.enabled && s.project_id == project_id && s.event_types.contains(&event_type))
            .cloned()
            .collect()
    }
}

struct Delivery {
    subscription: WebhookSubscription,
    body: Vec<u8>,
}

pub struct WebhookDispatcher {
    subscriptions: Arc<WebhookStore>,
    queue: tokio::sync::mpsc::UnboundedSender<Delivery>,
}

impl WebhookDispatcher {
    /// Spawn the background delivery loop. `max_attempts` comes from
    /// `Config::webhook_max_attempts`.
    pub fn new(
        subscriptions: Arc<WebhookStore>,
        event_log: Arc<dyn EventLog>,
        max_attempts: u32,
        sink: Arc<dyn WebhookSink>,
    ) -> Self {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Delivery>();

        tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                deliver_with_retry(sink.as_ref(), delivery, max_attempts, event_log.clone()).await;
            }
        });

        Self { subscriptions, queue: tx }
    }

    /// Fan out an appended event-log record to every matching subscription.
    pub fn dispatch(&self, record: &EventRecord) {
        let body = match serde_json::to_vec(&record) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize event for webhook delivery");
                return;
            }
        };

        for subscription in self.subscriptions.matching(&record.project_id, record.event_type) {
            let _ = self.queue.send(Delivery {
                subscription,
                body: body.clone(),
            });
        }
    }
}

async fn deliver_with_retry(sink: &dyn WebhookSink, delivery: Delivery, max_attempts: u32, event_log: Arc<dyn EventLog>) {
    let signature = sign_hex(delivery.subscription.secret.as_bytes(), &delivery.body);
    let signature_header = format!("sha256={signature}");

    for attempt in 0..max_attempts {
        let result = sink.send(&delivery.subscription.url, &delivery.body, &signature_header).await;

        match result {
            Ok(status) if (200..300).contains(&status) => return,
            Ok(status) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    status,
                    url = %delivery.subscription.url,
                    "webhook delivery rejected"
                );
            }
            Err(err) => {
                tracing::warn!(attempt = attempt + 1, error = %err, url = %delivery.subscription.url, "webhook delivery failed");
            }
        }

        if attempt + 1 < max_attempts {
            let delay = backoff_delay(attempt);
            tokio::time::sleep(delay).await;
        }
    }

    event_log
        .append(
            TenantScoped::new(&delivery.subscription.project_id),
            EventAppend::new(
                EventType::WebhookSendFailed,
                "webhook.dispatch",
                "failed",
                serde_json::json!({
                    "webhook_id": delivery.subscription.id,
                    "url": delivery.subscription.url,
                }),
            )
            .with_reason_codes(vec![orbicheck_core::ReasonCode::WebhookSendFailed]),
        )
        .await;
}

fn backoff_delay(attempt: u32) -> Duration {
    let secs = BASE_DELAY_SECS.saturating_mul(1u64 << attempt.min(10));
    Duration::from_secs(secs.min(MAX_DELAY_SECS))
}

/// Wraps an [`EventLog`] so every appended record is also fanned out to
/// subscribed webhooks. Lets `OrderEvaluator` (which only knows about
/// `EventLog`, not the dispatcher) trigger deliveries without depending on
/// `reqwest` itself.
pub struct DispatchingEventLog {
    inner: Arc<dyn EventLog>,
    dispatcher: Arc<WebhookDispatcher>,
}

impl DispatchingEventLog {
    pub fn new(inner: Arc<dyn EventLog>, dispatcher: Arc<WebhookDispatcher>) -> Self {
        Self { inner, dispatcher }
    }
}

#[async_trait]
impl EventLog for DispatchingEventLog {
    async fn append(&self, tenant: TenantScoped<'_>, event: EventAppend) -> EventRecord {
        let record = self.inner.append(tenant, event).await;
        self.dispatcher.dispatch(&record);
        record
    }

    async fn list(&self, tenant: TenantScoped<'_>, cursor: Option<&str>, limit: usize) -> LogPage {
        self.inner.list(tenant, cursor, limit).await
    }

    async fn delete(&self, tenant: TenantScoped<'_>, id: Option<&str>) -> usize {
        self.inner.delete(tenant, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbicheck_orders::InMemoryEventLog;

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_secs(30));
        assert_eq!(backoff_delay(1), Duration::from_secs(60));
        assert!(backoff_delay(10) <= Duration::from_secs(MAX_DELAY_SECS));
    }

    #[test]
    fn store_matches_only_enabled_subscriptions_for_project_and_event() {
        let store = WebhookStore::default();
        store.register(WebhookSubscription {
            id: "wh_1".to_string(),
            project_id: "proj_1".to_string(),
            url: "https://example.com/hook".to_string(),
            secret: "s3cret".to_string(),
            event_types: vec![EventType::OrderEvaluated],
            enabled: true,
        });
        store.register(WebhookSubscription {
            id: "wh_2".to_string(),
            project_id: "proj_1".to_string(),
            url: "https://example.com/other".to_string(),
            secret: "s3cret".to_string(),
            event_types: vec![EventType::DedupeMerge],
            enabled: false,
        });

        let matches = store.matching("proj_1", EventType::OrderEvaluated);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "wh_1");
    }

    struct AlwaysSucceeds;
    #[async_trait]
    impl WebhookSink for AlwaysSucceeds {
        async fn send(&self, _url: &str, _body: &[u8], _signature_header: &str) -> Result<u16, String> {
            Ok(200)
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl WebhookSink for AlwaysFails {
        async fn send(&self, _url: &str, _body: &[u8], _signature_header: &str) -> Result<u16, String> {
            Err("connection refused".to_string())
        }
    }

    fn delivery() -> Delivery {
        Delivery {
            subscription: WebhookSubscription {
                id: "wh_1".to_string(),
                project_id: "proj_1".to_string(),
                url: "https://example.com/hook".to_string(),
                secret: "s3cret".to_string(),
                event_types: vec![EventType::OrderEvaluated],
                enabled: true,
            },
            body: b"{}".to_vec(),
        }
    }

    #[tokio::test]
    async fn successful_send_does_not_touch_the_event_log() {
        let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::default());
        deliver_with_retry(&AlwaysSucceeds, delivery(), 3, event_log.clone()).await;
        let page = event_log.list(TenantScoped::new("proj_1"), None, 10).await;
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn exhausting_retries_appends_a_webhook_send_failed_event() {
        let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::default());
        deliver_with_retry(&AlwaysFails, delivery(), 1, event_log.clone()).await;
        let page = event_log.list(TenantScoped::new("proj_1"), None, 10).await;
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].event_type, EventType::WebhookSendFailed);
        assert_eq!(
            page.records[0].reason_codes,
            vec![orbicheck_core::ReasonCode::WebhookSendFailed]
        );
    }
}
