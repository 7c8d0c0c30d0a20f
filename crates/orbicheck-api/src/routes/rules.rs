//! `GET /v1/rules`, `/v1/rules/catalog`, `/v1/rules/catalog/error-codes`
//! (§3, §4.10).

use axum::extract::State;
use axum::Json;

use orbicheck_core::reason_code::{ReasonCategory, ReasonCode, ReasonSeverity};
use orbicheck_rules::Rule;

use crate::state::AppState;

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<Rule>> {
    let engine = state.rule_engine.read();
    let rules = engine
        .as_ref()
        .map(|e| e.rules().to_vec())
        .unwrap_or_default();
    Json(rules)
}

#[derive(serde::Serialize)]
pub struct RuleCatalogEntry {
    pub action_kinds: Vec<&'static str>,
    pub field_names: Vec<&'static str>,
}

/// A static description of what a rule expression can reference — not the
/// currently configured rules (that's `list_rules`), but the vocabulary
/// available when authoring one.
pub async fn rule_catalog() -> Json<RuleCatalogEntry> {
    Json(RuleCatalogEntry {
        action_kinds: vec!["approve", "hold", "block"],
        field_names: vec![
            "email",
            "phone",
            "address",
            "name",
            "ip",
            "device",
            "risk_score",
            "risk_level",
            "metadata",
            "transaction_amount",
            "currency",
            "session_id",
            "customer_dedupe_matches",
            "address_dedupe_matches",
        ],
    })
}

#[derive(serde::Serialize)]
pub struct ReasonCodeEntry {
    pub code: &'static str,
    pub category: ReasonCategory,
    pub severity: ReasonSeverity,
}

pub async fn error_code_catalog() -> Json<Vec<ReasonCodeEntry>> {
    Json(
        ReasonCode::ALL
            .iter()
            .map(|code| ReasonCodeEntry {
                code: code.as_str(),
                category: code.category(),
                severity: code.severity(),
            })
            .collect(),
    )
}
