//! # Rule Engine (§4.10)
//!
//! Fires enabled rules in priority-desc, created-at-asc order and aggregates
//! their actions. Every rule evaluation is wall-clock budgeted; an
//! expression that blows the budget is skipped rather than allowed to stall
//! the whole evaluation.

use std::time::{Duration, Instant};

use crate::context::EvaluationContext;
use crate::rule::{Rule, RuleAction};

const RULE_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    Approve,
    Hold,
    Review,
    Block,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineOutcome {
    pub action: FinalAction,
    pub fired_rule_ids: Vec<String>,
}

pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Self { rules }
    }

    /// The configured rule catalogue, in firing order. Used by the
    /// `/v1/rules` listing endpoint.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate every enabled rule against `ctx` and aggregate per §4.10.
    /// `risk_score`/`risk_level` drive both rule expressions (via `ctx`) and
    /// the final fallback thresholding, so callers pass the same values
    /// already baked into `ctx`.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EngineOutcome {
        let mut fired: Vec<(&Rule, bool)> = Vec::new();

        for rule in self.rules.iter().filter(|r| r.enabled) {
            let start = Instant::now();
            let matched = rule.expression.eval_bool(ctx);
            let elapsed = start.elapsed();
            if elapsed > RULE_TIMEOUT {
                tracing::warn!(rule_id = %rule.id, elapsed_ms = elapsed.as_millis(), "rule exceeded evaluation budget, skipping");
                continue;
            }
            if matched {
                fired.push((rule, matched));
            }
        }

        let fired_rule_ids: Vec<String> = fired.iter().map(|(r, _)| r.id.clone()).collect();

        if fired.iter().any(|(r, _)| r.action == RuleAction::Approve) {
            return EngineOutcome {
                action: FinalAction::Approve,
                fired_rule_ids,
            };
        }

        if fired.iter().any(|(r, _)| r.action == RuleAction::Block) {
            return EngineOutcome {
                action: FinalAction::Block,
                fired_rule_ids,
            };
        }

        if fired.iter().any(|(r, _)| r.action == RuleAction::Hold) {
            let escalate = ctx.risk_score >= 80.0 || ctx.risk_level == "critical";
            return EngineOutcome {
                action: if escalate { FinalAction::Review } else { FinalAction::Hold },
                fired_rule_ids,
            };
        }

        let action = if ctx.risk_score >= 80.0 {
            FinalAction::Block
        } else if ctx.risk_score >= 60.0 {
            FinalAction::Review
        } else if ctx.risk_score >= 35.0 {
            FinalAction::Hold
        } else {
            FinalAction::Approve
        };

        EngineOutcome {
            action,
            fired_rule_ids,
        }
    }
}
