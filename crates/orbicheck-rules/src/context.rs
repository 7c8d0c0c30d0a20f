//! The fixed set of fields rule expressions may read (§4.10).

use std::collections::HashMap;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EvaluationContext {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub name: Option<String>,
    pub ip: Option<String>,
    pub device: Option<String>,
    pub risk_score: f64,
    pub risk_level: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub transaction_amount: f64,
    pub currency: Option<String>,
    pub session_id: Option<String>,
    pub customer_dedupe_matches: i64,
    pub address_dedupe_matches: i64,
}
