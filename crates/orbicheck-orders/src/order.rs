//! # Order Risk Evaluator (§4.11)
//!
//! Orchestrates validation, dedupe, and the rule engine into a single risk
//! score and action, then persists the customer/address/order records and
//! appends the event-log entry. Tenant resolution (auth context → project
//! id) happens one layer up in `orbicheck-api`; this evaluator takes
//! `project_id` as a plain parameter and wraps it in a [`TenantScoped`]
//! marker once, before threading it to every store/event-log call.

use std::collections::HashMap;
use std::sync::Arc;

use orbicheck_core::{ReasonCode, TenantScoped};
use orbicheck_dedupe::{address as address_dedupe, customer as customer_dedupe};
use orbicheck_dedupe::{AddressDedupeQuery, AddressRecord, CustomerDedupeQuery, CustomerRecord, SuggestedAction};
use orbicheck_rules::{EvaluationContext, FinalAction, RuleEngine};
use orbicheck_validate::{AddressInput, AddressValidator, EmailValidator, PhoneValidator};

use crate::event::{EventAppend, EventLog, EventType};
use crate::store::{AddressStore, CustomerStore, OrderStore};

/// For first-seen orders (no existing dedupe match for the customer), the
/// raw risk score is capped here before thresholding — a single brand-new
/// order can never alone reach `block`.
pub const FIRST_SEEN_RISK_CAP: f64 = 60.0;
const HIGH_VALUE_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderCustomerInput {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderInput {
    pub order_id: String,
    pub customer: OrderCustomerInput,
    pub shipping_address: AddressInput,
    pub total_amount: f64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub country_hint: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Observable signals distinct from `reason_codes`: a tag marks a
/// condition the evaluator noticed along the way (worked examples, §4.11),
/// while a reason code is what a client uses to understand *why* the risk
/// score moved. A single order can carry both for the same condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTag {
    PoBoxDetected,
    CodOrder,
    HighRiskRto,
    HighValueOrder,
    PotentialDuplicateCustomer,
    DuplicateOrder,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderEvaluationResult {
    pub order_id: String,
    pub duplicate: bool,
    pub risk_score: f64,
    pub risk_level: String,
    pub action: FinalAction,
    pub reason_codes: Vec<ReasonCode>,
    pub tags: Vec<OrderTag>,
    pub fired_rule_ids: Vec<String>,
    /// Overwritten by the route handler with the per-request id; the
    /// evaluator itself has no notion of an HTTP request.
    #[serde(default)]
    pub request_id: String,
}

pub struct OrderEvaluator {
    order_store: Arc<dyn OrderStore>,
    customer_store: Arc<dyn CustomerStore>,
    address_store: Arc<dyn AddressStore>,
    event_log: Arc<dyn EventLog>,
    email_validator: Arc<EmailValidator>,
    phone_validator: Arc<PhoneValidator>,
    address_validator: Arc<AddressValidator>,
    rule_engine: Option<Arc<RuleEngine>>,
}

impl OrderEvaluator {
    pub fn new(
        order_store: Arc<dyn OrderStore>,
        customer_store: Arc<dyn CustomerStore>,
        address_store: Arc<dyn AddressStore>,
        event_log: Arc<dyn EventLog>,
        email_validator: Arc<EmailValidator>,
        phone_validator: Arc<PhoneValidator>,
        address_validator: Arc<AddressValidator>,
        rule_engine: Option<Arc<RuleEngine>>,
    ) -> Self {
        Self {
            order_store,
            customer_store,
            address_store,
            event_log,
            email_validator,
            phone_validator,
            address_validator,
            rule_engine,
        }
    }

    pub async fn evaluate(&self, project_id: &str, input: OrderInput) -> OrderEvaluationResult {
        let tenant = TenantScoped::new(project_id);
        let mut risk: f64 = 0.0;
        let mut reason_codes: Vec<ReasonCode> = Vec::new();
        let mut tags: Vec<OrderTag> = Vec::new();

        let duplicate = self.order_store.exists(tenant, &input.order_id).await;
        if duplicate {
            risk += 50.0;
            reason_codes.push(ReasonCode::OrderDuplicateDetected);
            tags.push(OrderTag::DuplicateOrder);
        }

        let email_result = match &input.customer.email {
            Some(raw) => Some(self.email_validator.validate(raw).await),
            None => None,
        };
        let phone_result = match &input.customer.phone {
            Some(raw) => Some(self.phone_validator.validate(raw, input.country_hint.as_deref(), false).await),
            None => None,
        };

        let existing_customers = self.customer_store.list(tenant).await;
        let customer_query = CustomerDedupeQuery {
            normalized_email: email_result.as_ref().map(|r| r.normalized.clone()),
            normalized_phone: phone_result.as_ref().and_then(|r| r.e164.clone()),
            first_name: input.customer.first_name.clone(),
            last_name: input.customer.last_name.clone(),
        };
        let customer_dedupe_result = customer_dedupe::find_candidates(&customer_query, &existing_customers);
        let first_seen = customer_dedupe_result.candidates.is_empty();
        if !customer_dedupe_result.candidates.is_empty() {
            risk += 20.0;
            reason_codes.push(ReasonCode::OrderCustomerDedupeMatch);
            tags.push(OrderTag::PotentialDuplicateCustomer);
        }
        if customer_dedupe_result.suggested_action == SuggestedAction::MergeWith {
            self.log_dedupe_merge(
                tenant,
                "customer",
                &customer_dedupe_result.candidates[0].id,
                &customer_dedupe_result.candidates,
            )
            .await;
        }

        let address_result = self.address_validator.validate(&input.shipping_address).await;
        let normalized_address = address_result.normalized.clone();
        let address_hash = address_hash(&normalized_address);

        let existing_addresses = self.address_store.list(tenant).await;
        let address_query = AddressDedupeQuery {
            address_hash: address_hash.clone(),
            postal_code: normalized_address.postal_code.clone(),
            city: normalized_address.city.clone(),
            country: normalized_address.country.clone(),
            line1: normalized_address.line1.clone(),
        };
        let address_dedupe_result = address_dedupe::find_candidates(&address_query, &existing_addresses);
        if !address_dedupe_result.candidates.is_empty() {
            risk += 15.0;
            reason_codes.push(ReasonCode::OrderAddressDedupeMatch);
        }
        if address_dedupe_result.suggested_action == SuggestedAction::MergeWith {
            self.log_dedupe_merge(
                tenant,
                "address",
                &address_dedupe_result.candidates[0].id,
                &address_dedupe_result.candidates,
            )
            .await;
        }

        if address_result.po_box {
            risk += 30.0;
            reason_codes.push(ReasonCode::OrderPoBoxBlock);
            tags.push(OrderTag::PoBoxDetected);
        }
        if !address_result.postal_city_match {
            risk += 10.0;
        }
        match address_result.in_bounds {
            Some(false) => risk += 40.0,
            None => risk += 20.0,
            Some(true) => {}
        }
        if normalized_address.line1.is_empty() || normalized_address.city.is_empty() {
            risk += 30.0;
            reason_codes.push(ReasonCode::AddressInvalidFormat);
        }

        let disposable_email = email_result.as_ref().map(|r| r.disposable).unwrap_or(false);
        if let Some(result) = &email_result {
            if !result.valid {
                risk += 25.0;
            }
            if result.disposable {
                reason_codes.push(ReasonCode::OrderDisposableEmail);
            }
        }
        if let Some(result) = &phone_result {
            if !result.valid {
                risk += 25.0;
            }
        }

        let phone_country_mismatch = phone_result
            .as_ref()
            .and_then(|r| r.country.as_deref())
            .map(|phone_country| !phone_country.eq_ignore_ascii_case(&normalized_address.country))
            .unwrap_or(false);
        // §7: region mismatch is postal↔city disagreement OR a phone
        // country that disagrees with the shipping address, not phone
        // country alone.
        let region_mismatch = !address_result.postal_city_match || phone_country_mismatch;

        let is_cod = input
            .payment_method
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("cod"))
            .unwrap_or(false);
        let mut high_risk_rto = false;
        if is_cod {
            risk += 20.0;
            tags.push(OrderTag::CodOrder);
            if first_seen && region_mismatch && disposable_email {
                risk += 50.0;
                high_risk_rto = true;
                reason_codes.push(ReasonCode::OrderHighRiskRto);
                tags.push(OrderTag::HighRiskRto);
            }
        }

        if input.total_amount > HIGH_VALUE_THRESHOLD {
            risk += 15.0;
            tags.push(OrderTag::HighValueOrder);
        }

        // The cap exists to stop a brand-new order from reaching `block` on
        // weak signals alone; the high-risk-RTO bonus is itself gated on
        // "new customer" and exists specifically to let a first order reach
        // `block`, so it bypasses the cap rather than being swallowed by it.
        let cap = if first_seen && !high_risk_rto { FIRST_SEEN_RISK_CAP } else { 100.0 };
        let risk_score = risk.min(cap);
        let risk_level = risk_level_for(risk_score);

        let ctx = EvaluationContext {
            email: email_result.as_ref().map(|r| r.normalized.clone()),
            phone: phone_result.as_ref().and_then(|r| r.e164.clone()),
            address: Some(normalized_address.line1.clone()),
            name: Some(format!("{} {}", input.customer.first_name, input.customer.last_name)),
            ip: None,
            device: None,
            risk_score,
            risk_level: risk_level.clone(),
            metadata: input.metadata.clone(),
            transaction_amount: input.total_amount,
            currency: Some(input.currency.clone()),
            session_id: None,
            customer_dedupe_matches: customer_dedupe_result.candidates.len() as i64,
            address_dedupe_matches: address_dedupe_result.candidates.len() as i64,
        };

        let (action, fired_rule_ids) = match &self.rule_engine {
            Some(engine) => {
                let outcome = engine.evaluate(&ctx);
                (outcome.action, outcome.fired_rule_ids)
            }
            None => (fallback_action(risk_score), Vec::new()),
        };

        let customer_id = self
            .customer_store
            .upsert(
                tenant,
                CustomerRecord {
                    id: String::new(),
                    normalized_email: email_result.as_ref().map(|r| r.normalized.clone()),
                    normalized_phone: phone_result.as_ref().and_then(|r| r.e164.clone()),
                    first_name: input.customer.first_name.clone(),
                    last_name: input.customer.last_name.clone(),
                },
            )
            .await;
        let _address_id = self
            .address_store
            .upsert(
                tenant,
                AddressRecord {
                    id: String::new(),
                    address_hash,
                    postal_code: normalized_address.postal_code.clone(),
                    city: normalized_address.city.clone(),
                    country: normalized_address.country.clone(),
                    line1: normalized_address.line1.clone(),
                },
            )
            .await;
        if !duplicate {
            self.order_store.insert(tenant, &input.order_id).await;
        }

        let reason_codes = orbicheck_core::dedup_preserve_order(reason_codes);
        let tags = dedup_tags(tags);

        self.event_log
            .append(
                tenant,
                EventAppend::new(
                    EventType::OrderEvaluated,
                    "orders.evaluate",
                    action.to_string(),
                    serde_json::json!({
                        "order_id": input.order_id,
                        "customer_id": customer_id,
                        "risk_score": risk_score,
                        "risk_level": risk_level,
                        "duplicate": duplicate,
                        "tags": tags,
                    }),
                )
                .with_reason_codes(reason_codes.clone()),
            )
            .await;

        OrderEvaluationResult {
            order_id: input.order_id,
            duplicate,
            risk_score,
            risk_level,
            action,
            reason_codes,
            tags,
            fired_rule_ids,
            request_id: String::new(),
        }
    }

    async fn log_dedupe_merge(
        &self,
        tenant: TenantScoped<'_>,
        entity: &str,
        canonical_id: &str,
        candidates: &[orbicheck_dedupe::Candidate],
    ) {
        let merged_ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        self.event_log
            .append(
                tenant,
                EventAppend::new(
                    EventType::DedupeMerge,
                    "orders.evaluate",
                    "merged",
                    serde_json::json!({
                        "entity": entity,
                        "canonical_id": canonical_id,
                        "merged_ids": merged_ids,
                    }),
                )
                .with_reason_codes(vec![ReasonCode::DedupeMergeWith]),
            )
            .await;
    }
}

fn dedup_tags(tags: Vec<OrderTag>) -> Vec<OrderTag> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(*t)).collect()
}

fn address_hash(normalized: &orbicheck_validate::NormalizedAddress) -> String {
    let value = serde_json::to_value(normalized).unwrap_or(serde_json::Value::Null);
    let canonical = orbicheck_core::digest::canonical_json(&value);
    orbicheck_crypto::sha256::sha256_hex(canonical.as_bytes())
}

fn risk_level_for(score: f64) -> String {
    if score >= 80.0 {
        "critical"
    } else if score >= 60.0 {
        "high"
    } else if score >= 35.0 {
        "medium"
    } else {
        "low"
    }
    .to_string()
}

/// §4.11 step 10's own thresholds, used when no rule engine is configured:
/// stricter than the rule engine's fallback (§4.10: 80/60/35) since the
/// evaluator has already folded every signal into `risk_score` by here.
fn fallback_action(risk_score: f64) -> FinalAction {
    if risk_score >= 70.0 {
        FinalAction::Block
    } else if risk_score >= 40.0 {
        FinalAction::Hold
    } else {
        FinalAction::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InMemoryEventLog;
    use crate::store::{InMemoryAddressStore, InMemoryCustomerStore, InMemoryOrderStore};
    use orbicheck_cache::{DisposableDomainSet, InMemoryCache};
    use orbicheck_validate::collaborators::{
        EmptyPostalReferenceTable, NullGeocoder, NullOtpProvider, SystemDnsResolver,
    };

    fn address(line1: &str) -> AddressInput {
        AddressInput {
            line1: line1.to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "62704".to_string(),
            state: None,
            country: "us".to_string(),
        }
    }

    fn evaluator() -> OrderEvaluator {
        let cache: Arc<dyn orbicheck_cache::Cache> = Arc::new(InMemoryCache::new());
        OrderEvaluator::new(
            Arc::new(InMemoryOrderStore::default()),
            Arc::new(InMemoryCustomerStore::default()),
            Arc::new(InMemoryAddressStore::default()),
            Arc::new(InMemoryEventLog::default()),
            Arc::new(EmailValidator::new(
                cache.clone(),
                Arc::new(SystemDnsResolver),
                Arc::new(DisposableDomainSet::new(["mailinator.com".to_string()].into())),
            )),
            Arc::new(PhoneValidator::new(Arc::new(NullOtpProvider))),
            Arc::new(AddressValidator::new(cache, Arc::new(NullGeocoder), Arc::new(EmptyPostalReferenceTable))),
            None,
        )
    }

    fn base_input() -> OrderInput {
        OrderInput {
            order_id: "ord_1".to_string(),
            customer: OrderCustomerInput {
                email: Some("user@example.com".to_string()),
                phone: Some("+14155552671".to_string()),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
            },
            shipping_address: address("123 Main St"),
            total_amount: 50.0,
            currency: "USD".to_string(),
            payment_method: None,
            country_hint: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn first_order_with_clean_signals_approves() {
        let eval = evaluator();
        let result = eval.evaluate("proj_1", base_input()).await;
        assert_eq!(result.action, FinalAction::Approve);
        assert!(!result.duplicate);
    }

    #[tokio::test]
    async fn duplicate_order_is_flagged_and_not_reinserted() {
        let eval = evaluator();
        eval.evaluate("proj_1", base_input()).await;
        let second = eval.evaluate("proj_1", base_input()).await;
        assert!(second.duplicate);
        assert!(second.reason_codes.contains(&ReasonCode::OrderDuplicateDetected));
        assert!(second.tags.contains(&OrderTag::DuplicateOrder));
    }

    #[tokio::test]
    async fn po_box_address_raises_risk_and_tags_reason_code() {
        let eval = evaluator();
        let mut input = base_input();
        input.shipping_address = address("PO Box 99");
        let result = eval.evaluate("proj_1", input).await;
        assert!(result.reason_codes.contains(&ReasonCode::OrderPoBoxBlock));
        assert!(result.tags.contains(&OrderTag::PoBoxDetected));
        assert!(result.risk_score >= 30.0);
    }

    #[tokio::test]
    async fn high_value_order_increases_risk_score_and_tags_it() {
        let eval = evaluator();
        let mut low = base_input();
        low.order_id = "ord_low".to_string();
        let mut high = base_input();
        high.order_id = "ord_high".to_string();
        high.total_amount = 5000.0;
        let low_result = eval.evaluate("proj_1", low).await;
        let high_result = eval.evaluate("proj_1", high).await;
        assert!(high_result.risk_score > low_result.risk_score);
        assert!(high_result.tags.contains(&OrderTag::HighValueOrder));
        assert!(!low_result.tags.contains(&OrderTag::HighValueOrder));
    }

    #[tokio::test]
    async fn first_seen_order_risk_is_capped_below_block_threshold() {
        let eval = evaluator();
        let mut input = base_input();
        input.shipping_address = address("PO Box 99");
        input.payment_method = Some("cod".to_string());
        let result = eval.evaluate("proj_1", input).await;
        assert!(result.risk_score <= FIRST_SEEN_RISK_CAP);
    }

    #[tokio::test]
    async fn cod_payment_method_adds_risk_and_tags_cod_order() {
        let eval = evaluator();
        let mut cod = base_input();
        cod.order_id = "ord_cod".to_string();
        cod.payment_method = Some("cod".to_string());
        let mut prepaid = base_input();
        prepaid.order_id = "ord_prepaid".to_string();
        let cod_result = eval.evaluate("proj_1", cod).await;
        let prepaid_result = eval.evaluate("proj_1", prepaid).await;
        assert!(cod_result.risk_score > prepaid_result.risk_score);
        assert!(cod_result.tags.contains(&OrderTag::CodOrder));
    }

    struct MismatchingPostalReferenceTable;
    #[async_trait::async_trait]
    impl orbicheck_validate::collaborators::PostalReferenceTable for MismatchingPostalReferenceTable {
        async fn expected_city(&self, _country: &str, _postal_code: &str) -> Option<String> {
            Some("Someplace Else".to_string())
        }
    }

    #[tokio::test]
    async fn high_risk_rto_combo_reaches_block_uncapped() {
        let cache: Arc<dyn orbicheck_cache::Cache> = Arc::new(InMemoryCache::new());
        let eval = OrderEvaluator::new(
            Arc::new(InMemoryOrderStore::default()),
            Arc::new(InMemoryCustomerStore::default()),
            Arc::new(InMemoryAddressStore::default()),
            Arc::new(InMemoryEventLog::default()),
            Arc::new(EmailValidator::new(
                cache.clone(),
                Arc::new(SystemDnsResolver),
                Arc::new(DisposableDomainSet::new(["mailinator.com".to_string()].into())),
            )),
            Arc::new(PhoneValidator::new(Arc::new(NullOtpProvider))),
            Arc::new(AddressValidator::new(cache, Arc::new(NullGeocoder), Arc::new(MismatchingPostalReferenceTable))),
            None,
        );

        let mut input = base_input();
        input.customer.email = Some("user@mailinator.com".to_string());
        input.customer.phone = Some("+525512345678".to_string()); // MX number, US shipping address
        input.payment_method = Some("cod".to_string());
        input.total_amount = 500.0;

        let result = eval.evaluate("proj_1", input).await;
        assert_eq!(result.risk_score, 100.0);
        assert_eq!(result.action, FinalAction::Block);
        assert!(result.reason_codes.contains(&ReasonCode::OrderHighRiskRto));
        assert!(result.tags.contains(&OrderTag::HighRiskRto));
    }

    #[tokio::test]
    async fn postal_city_mismatch_alone_triggers_high_risk_rto() {
        // Regression: region mismatch is postal<->city OR phone-country
        // mismatch, not phone-country mismatch alone. A matching phone
        // country with a postal/city mismatch must still count.
        let cache: Arc<dyn orbicheck_cache::Cache> = Arc::new(InMemoryCache::new());
        let eval = OrderEvaluator::new(
            Arc::new(InMemoryOrderStore::default()),
            Arc::new(InMemoryCustomerStore::default()),
            Arc::new(InMemoryAddressStore::default()),
            Arc::new(InMemoryEventLog::default()),
            Arc::new(EmailValidator::new(
                cache.clone(),
                Arc::new(SystemDnsResolver),
                Arc::new(DisposableDomainSet::new(["mailinator.com".to_string()].into())),
            )),
            Arc::new(PhoneValidator::new(Arc::new(NullOtpProvider))),
            Arc::new(AddressValidator::new(cache, Arc::new(NullGeocoder), Arc::new(MismatchingPostalReferenceTable))),
            None,
        );

        let mut input = base_input();
        input.customer.email = Some("user@mailinator.com".to_string());
        // Same country as the shipping address (US) — only the postal/city
        // mismatch should be driving region_mismatch here.
        input.customer.phone = Some("+14155552671".to_string());
        input.payment_method = Some("cod".to_string());
        input.total_amount = 500.0;

        let result = eval.evaluate("proj_1", input).await;
        assert!(result.reason_codes.contains(&ReasonCode::OrderHighRiskRto));
    }

    #[tokio::test]
    async fn returning_customer_with_matching_email_dedupes() {
        let eval = evaluator();
        let mut first = base_input();
        first.order_id = "ord_1".to_string();
        eval.evaluate("proj_1", first).await;

        let mut second = base_input();
        second.order_id = "ord_2".to_string();
        let result = eval.evaluate("proj_1", second).await;
        assert!(result.reason_codes.contains(&ReasonCode::OrderCustomerDedupeMatch));
        assert!(result.tags.contains(&OrderTag::PotentialDuplicateCustomer));
    }
}
