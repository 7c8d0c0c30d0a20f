//! Shared application state threaded through every handler via `State<AppState>`.

use std::sync::Arc;

use orbicheck_cache::{Cache, DisposableDomainSet, IdempotencyStore, InMemoryCache, RateLimiter};
use orbicheck_orders::{
    AddressStore, CustomerStore, EventLog, InMemoryAddressStore, InMemoryCustomerStore,
    InMemoryEventLog, InMemoryOrderStore, OrderEvaluator, OrderStore,
};
use orbicheck_rules::RuleEngine;
use orbicheck_validate::collaborators::{
    EmptyPostalReferenceTable, NullGeocoder, NullOtpProvider, SeedDisposableDomainSource,
    SystemDnsResolver,
};
use orbicheck_validate::{AddressValidator, EmailValidator, PhoneValidator, TaxIdValidator};

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::db::postgres::{PgAddressStore, PgCustomerStore, PgEventLog, PgOrderStore};
use crate::middleware::metrics::ApiMetrics;
use crate::webhook::{DispatchingEventLog, ReqwestWebhookSink, WebhookDispatcher, WebhookStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: Option<sqlx::PgPool>,
    pub credentials: CredentialStore,

    pub cache: Arc<dyn Cache>,
    pub disposable_domains: Arc<DisposableDomainSet>,
    pub rate_limiter: Arc<RateLimiter>,
    pub idempotency: Arc<IdempotencyStore>,

    pub email_validator: Arc<EmailValidator>,
    pub phone_validator: Arc<PhoneValidator>,
    pub address_validator: Arc<AddressValidator>,
    pub taxid_validator: Arc<TaxIdValidator>,

    pub customer_store: Arc<dyn CustomerStore>,
    pub address_store: Arc<dyn AddressStore>,
    pub order_store: Arc<dyn OrderStore>,
    pub event_log: Arc<dyn EventLog>,

    /// Swappable so `/v1/rules` management could publish a new catalogue
    /// without a restart; `None` means the evaluator falls back to its own
    /// thresholds per §4.10/§4.11.
    pub rule_engine: Arc<parking_lot::RwLock<Option<Arc<RuleEngine>>>>,
    pub order_evaluator: Arc<OrderEvaluator>,

    pub metrics: ApiMetrics,
    pub webhooks: Arc<WebhookStore>,
    pub webhook_dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Assemble the default state: in-memory stores, null/seed collaborator
    /// implementations, no rule engine configured. `db_pool` is threaded in
    /// separately once `db::init_pool` resolves (§9.4).
    pub async fn new(config: Config, db_pool: Option<sqlx::PgPool>) -> Self {
        let config = Arc::new(config);
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());

        let disposable_domains = Arc::new(DisposableDomainSet::default());
        refresh_disposable_domains(&disposable_domains).await;

        let email_validator = Arc::new(EmailValidator::new(
            cache.clone(),
            Arc::new(SystemDnsResolver),
            disposable_domains.clone(),
        ));
        let phone_validator = Arc::new(PhoneValidator::new(Arc::new(NullOtpProvider)));
        let address_validator = Arc::new(AddressValidator::new(
            cache.clone(),
            Arc::new(NullGeocoder),
            Arc::new(EmptyPostalReferenceTable),
        ));
        let taxid_validator = Arc::new(TaxIdValidator::new(Arc::new(
            orbicheck_validate::collaborators::NullVatRegistry,
        )));

        let (customer_store, address_store, order_store, event_log): (
            Arc<dyn CustomerStore>,
            Arc<dyn AddressStore>,
            Arc<dyn OrderStore>,
            Arc<dyn EventLog>,
        ) = match &db_pool {
            Some(pool) => (
                Arc::new(PgCustomerStore::new(pool.clone())),
                Arc::new(PgAddressStore::new(pool.clone())),
                Arc::new(PgOrderStore::new(pool.clone())),
                Arc::new(PgEventLog::new(pool.clone())),
            ),
            None => (
                Arc::new(InMemoryCustomerStore::default()),
                Arc::new(InMemoryAddressStore::default()),
                Arc::new(InMemoryOrderStore::default()),
                Arc::new(InMemoryEventLog::default()),
            ),
        };

        let webhooks = Arc::new(WebhookStore::default());
        let webhook_dispatcher = Arc::new(WebhookDispatcher::new(
            webhooks.clone(),
            event_log.clone(),
            config.webhook_max_attempts,
            Arc::new(ReqwestWebhookSink::new()),
        ));
        let event_log: Arc<dyn EventLog> =
            Arc::new(DispatchingEventLog::new(event_log, webhook_dispatcher.clone()));

        let order_evaluator = Arc::new(OrderEvaluator::new(
            order_store.clone(),
            customer_store.clone(),
            address_store.clone(),
            event_log.clone(),
            email_validator.clone(),
            phone_validator.clone(),
            address_validator.clone(),
            None,
        ));

        Self {
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_count, 60)),
            idempotency: Arc::new(IdempotencyStore::new()),
            credentials: CredentialStore::default(),
            db_pool,
            cache,
            disposable_domains,
            email_validator,
            phone_validator,
            address_validator,
            taxid_validator,
            customer_store,
            address_store,
            order_store,
            event_log,
            rule_engine: Arc::new(parking_lot::RwLock::new(None)),
            order_evaluator,
            metrics: ApiMetrics::new(),
            webhooks,
            webhook_dispatcher,
            config,
        }
    }
}

/// Populate the disposable-domain set with the built-in seed list at
/// startup. A production deployment with `DISPOSABLE_LIST_URL` configured
/// would instead spawn a periodic refresher against a real
/// `DisposableDomainSource`; wiring that HTTP-backed source is left for
/// when the operator actually sets the variable.
async fn refresh_disposable_domains(set: &DisposableDomainSet) {
    use orbicheck_validate::collaborators::DisposableDomainSource;
    let source = SeedDisposableDomainSource;
    match source.fetch().await {
        Ok(domains) => set.refresh(domains),
        Err(err) => tracing::warn!(error = %err, "failed to seed disposable-domain set"),
    }
}
