//! Rule definition (§4.10).

use chrono::{DateTime, Utc};

use crate::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Approve,
    Hold,
    Block,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub action: RuleAction,
    pub priority: i32,
    pub enabled: bool,
    pub expression: Expr,
    pub created_at: DateTime<Utc>,
}
