//! # Typed Rule Expression AST
//!
//! Rule expressions are a total, side-effect-free AST rather than a
//! string-eval language, so a rule's evaluation cost is bounded by its
//! AST size alone and every variant terminates without I/O.

use std::collections::HashMap;

use crate::context::EvaluationContext;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Field {
    Email,
    Phone,
    Address,
    Name,
    Ip,
    Device,
    RiskScore,
    RiskLevel,
    Metadata { key: String },
    TransactionAmount,
    Currency,
    SessionId,
    CustomerDedupeMatches,
    AddressDedupeMatches,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

/// The rule expression AST. `Expr::eval` is pure — no I/O, no allocation
/// beyond the comparisons it performs, guaranteed to terminate since there
/// is no recursion or looping construct, only fixed tree depth.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Field(Field),
    Literal(Value),
    Eq { left: Box<Expr>, right: Box<Expr> },
    Ne { left: Box<Expr>, right: Box<Expr> },
    Gt { left: Box<Expr>, right: Box<Expr> },
    Gte { left: Box<Expr>, right: Box<Expr> },
    Lt { left: Box<Expr>, right: Box<Expr> },
    Lte { left: Box<Expr>, right: Box<Expr> },
    In { needle: Box<Expr>, haystack: Vec<Expr> },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn eval(&self, ctx: &EvaluationContext) -> Value {
        match self {
            Expr::Field(field) => resolve_field(field, ctx),
            Expr::Literal(value) => value.clone(),
            Expr::Eq { left, right } => Value::Bool(left.eval(ctx) == right.eval(ctx)),
            Expr::Ne { left, right } => Value::Bool(left.eval(ctx) != right.eval(ctx)),
            Expr::Gt { left, right } => numeric_cmp(left, right, ctx, |a, b| a > b),
            Expr::Gte { left, right } => numeric_cmp(left, right, ctx, |a, b| a >= b),
            Expr::Lt { left, right } => numeric_cmp(left, right, ctx, |a, b| a < b),
            Expr::Lte { left, right } => numeric_cmp(left, right, ctx, |a, b| a <= b),
            Expr::In { needle, haystack } => {
                let n = needle.eval(ctx);
                Value::Bool(haystack.iter().any(|e| e.eval(ctx) == n))
            }
            Expr::And(exprs) => Value::Bool(exprs.iter().all(|e| e.eval(ctx).as_bool())),
            Expr::Or(exprs) => Value::Bool(exprs.iter().any(|e| e.eval(ctx).as_bool())),
            Expr::Not(inner) => Value::Bool(!inner.eval(ctx).as_bool()),
        }
    }

    /// True evaluates the full boolean result of this expression.
    pub fn eval_bool(&self, ctx: &EvaluationContext) -> bool {
        self.eval(ctx).as_bool()
    }
}

fn numeric_cmp(left: &Expr, right: &Expr, ctx: &EvaluationContext, cmp: impl Fn(f64, f64) -> bool) -> Value {
    match (left.eval(ctx).as_f64(), right.eval(ctx).as_f64()) {
        (Some(a), Some(b)) => Value::Bool(cmp(a, b)),
        _ => Value::Bool(false),
    }
}

fn resolve_field(field: &Field, ctx: &EvaluationContext) -> Value {
    match field {
        Field::Email => opt_str(&ctx.email),
        Field::Phone => opt_str(&ctx.phone),
        Field::Address => opt_str(&ctx.address),
        Field::Name => opt_str(&ctx.name),
        Field::Ip => opt_str(&ctx.ip),
        Field::Device => opt_str(&ctx.device),
        Field::RiskScore => Value::Num(ctx.risk_score),
        Field::RiskLevel => Value::Str(ctx.risk_level.clone()),
        Field::Metadata { key } => metadata_value(&ctx.metadata, key),
        Field::TransactionAmount => Value::Num(ctx.transaction_amount),
        Field::Currency => opt_str(&ctx.currency),
        Field::SessionId => opt_str(&ctx.session_id),
        Field::CustomerDedupeMatches => Value::Num(ctx.customer_dedupe_matches as f64),
        Field::AddressDedupeMatches => Value::Num(ctx.address_dedupe_matches as f64),
    }
}

fn opt_str(value: &Option<String>) -> Value {
    value.clone().map(Value::Str).unwrap_or(Value::Null)
}

fn metadata_value(metadata: &HashMap<String, serde_json::Value>, key: &str) -> Value {
    match metadata.get(key) {
        Some(serde_json::Value::String(s)) => Value::Str(s.clone()),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(Value::Num).unwrap_or(Value::Null),
        Some(serde_json::Value::Bool(b)) => Value::Bool(*b),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EvaluationContext {
        EvaluationContext {
            risk_score: 85.0,
            risk_level: "high".to_string(),
            transaction_amount: 1500.0,
            customer_dedupe_matches: 2,
            ..Default::default()
        }
    }

    #[test]
    fn field_comparison_against_literal() {
        let expr = Expr::Gte {
            left: Box::new(Expr::Field(Field::RiskScore)),
            right: Box::new(Expr::Literal(Value::Num(80.0))),
        };
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn string_equality_on_risk_level() {
        let expr = Expr::Eq {
            left: Box::new(Expr::Field(Field::RiskLevel)),
            right: Box::new(Expr::Literal(Value::Str("high".to_string()))),
        };
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn and_requires_all_branches() {
        let expr = Expr::And(vec![
            Expr::Gte {
                left: Box::new(Expr::Field(Field::RiskScore)),
                right: Box::new(Expr::Literal(Value::Num(80.0))),
            },
            Expr::Gt {
                left: Box::new(Expr::Field(Field::CustomerDedupeMatches)),
                right: Box::new(Expr::Literal(Value::Num(0.0))),
            },
        ]);
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn or_needs_only_one_branch() {
        let expr = Expr::Or(vec![
            Expr::Eq {
                left: Box::new(Expr::Field(Field::Currency)),
                right: Box::new(Expr::Literal(Value::Str("EUR".to_string()))),
            },
            Expr::Gt {
                left: Box::new(Expr::Field(Field::TransactionAmount)),
                right: Box::new(Expr::Literal(Value::Num(1000.0))),
            },
        ]);
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn not_negates_inner_result() {
        let expr = Expr::Not(Box::new(Expr::Literal(Value::Bool(false))));
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn missing_optional_field_resolves_null_not_match_on_eq_string() {
        let expr = Expr::Eq {
            left: Box::new(Expr::Field(Field::Email)),
            right: Box::new(Expr::Literal(Value::Str("nobody@example.com".to_string()))),
        };
        assert!(!expr.eval_bool(&ctx()));
    }

    #[test]
    fn in_checks_list_membership() {
        let expr = Expr::In {
            needle: Box::new(Expr::Field(Field::RiskLevel)),
            haystack: vec![
                Expr::Literal(Value::Str("medium".to_string())),
                Expr::Literal(Value::Str("high".to_string())),
            ],
        };
        assert!(expr.eval_bool(&ctx()));
    }

    #[test]
    fn metadata_field_reads_json_value() {
        let mut ctx = ctx();
        ctx.metadata.insert("card_type".to_string(), serde_json::json!("prepaid"));
        let expr = Expr::Eq {
            left: Box::new(Expr::Field(Field::Metadata {
                key: "card_type".to_string(),
            })),
            right: Box::new(Expr::Literal(Value::Str("prepaid".to_string()))),
        };
        assert!(expr.eval_bool(&ctx));
    }
}
