//! Payoff definitions: declarative, per-task reward schedules that sum
//! into a single payout figure.

use serde::{Deserialize, Serialize};

/// A named reward rule scoped to one `(swarm_id, task_id, payoff_type)`.
/// `payoff_type` is caller-defined vocabulary (`"bonus"`, `"quality"`,
/// ...); the one type the kernel treats specially is `"penalty"`, whose
/// resolved amount is subtracted from the total instead of added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoffDefinition {
    pub id: String,
    pub swarm_id: String,
    pub task_id: String,
    pub payoff_type: String,
    pub base_amount: f64,
    pub multiplier: f64,
    pub deadline: Option<i64>,
    pub decay_rate: Option<f64>,
    pub created_at: i64,
}

pub const PENALTY_TYPE: &str = "penalty";

impl PayoffDefinition {
    pub fn is_penalty(&self) -> bool {
        self.payoff_type == PENALTY_TYPE
    }

    /// `base_amount * multiplier`, decayed once `now` passes `deadline` (if
    /// both a deadline and a decay rate are set) by `max(0, 1 -
    /// overdueHours * decay_rate)`. Sign is not applied here; `calculate`
    /// decides whether this contributes positively or is subtracted.
    pub fn resolve_amount(&self, now: i64) -> f64 {
        let raw = self.base_amount * self.multiplier;
        match (self.deadline, self.decay_rate) {
            (Some(deadline), Some(rate)) if now > deadline => {
                let overdue_hours = (now - deadline) as f64 / 3_600_000.0;
                raw * (1.0 - overdue_hours * rate).max(0.0)
            }
            _ => raw,
        }
    }
}

/// Sums every definition's resolved amount at `now`, subtracting the
/// `"penalty"`-typed ones instead of adding them.
pub fn calculate_payout(definitions: &[PayoffDefinition], now: i64) -> f64 {
    definitions.iter().fold(0.0, |total, def| {
        let amount = def.resolve_amount(now);
        if def.is_penalty() {
            total - amount
        } else {
            total + amount
        }
    })
}
