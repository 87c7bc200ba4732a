//! Credit account domain model.

use serde::{Deserialize, Serialize};

/// Per-`(swarm, agent)` credit ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub swarm_id: String,
    pub agent_handle: String,
    pub balance: f64,
    pub reputation_score: f64,
    pub total_earned: f64,
    pub task_count: u64,
    pub success_count: u64,
}

impl CreditAccount {
    /// Freshly `getOrCreate`d account — zeroed, neutral reputation.
    pub fn zeroed(swarm_id: String, agent_handle: String) -> Self {
        Self {
            swarm_id,
            agent_handle,
            balance: 0.0,
            reputation_score: 0.5,
            total_earned: 0.0,
            task_count: 0,
            success_count: 0,
        }
    }

    /// Reputation update rule: on success `rep' = rep + w(1-rep)`, on
    /// failure `rep' = rep - w*rep`; result bounded to `[0,1]`.
    pub fn apply_reputation_event(&mut self, success: bool, weight: f64) {
        self.reputation_score = if success {
            self.reputation_score + weight * (1.0 - self.reputation_score)
        } else {
            self.reputation_score - weight * self.reputation_score
        }
        .clamp(0.0, 1.0);
    }
}

/// Kind of credit transaction recorded against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Spend,
    Bonus,
    Penalty,
}

impl TransactionKind {
    /// The signed delta this transaction kind applies to a balance, given
    /// a positive magnitude.
    pub fn signed_delta(&self, amount: f64) -> f64 {
        match self {
            Self::Earn | Self::Bonus => amount,
            Self::Spend | Self::Penalty => -amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    pub swarm_id: String,
    pub agent_handle: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub reason: Option<String>,
    pub created_at: i64,
}

/// One row of `getLeaderboard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub agent_handle: String,
    pub balance: f64,
    pub reputation_score: f64,
    pub total_earned: f64,
}

/// Ordering key for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardOrder {
    Balance,
    Reputation,
    TotalEarned,
}
