//! Typed-AST rule engine: see [`expr::Expr`] for the expression language,
//! [`rule::Rule`] for rule definitions, and [`engine::RuleEngine`] for
//! firing order and action aggregation (§4.10).

pub mod context;
pub mod engine;
pub mod expr;
pub mod rule;

pub use context::EvaluationContext;
pub use engine::{EngineOutcome, FinalAction, RuleEngine};
pub use expr::{Expr, Field, Value};
pub use rule::{Rule, RuleAction};
