//! Credit repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{CreditAccount, CreditTransaction, LeaderboardEntry, LeaderboardOrder};

#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Idempotent: first call inserts a zeroed account, subsequent calls
    /// return the existing one.
    async fn get_or_create(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<CreditAccount>;

    async fn save_account(&self, account: &CreditAccount) -> FleetResult<()>;

    async fn record_transaction(&self, transaction: &CreditTransaction) -> FleetResult<()>;

    async fn list_transactions(
        &self,
        swarm_id: &str,
        agent_handle: &str,
    ) -> FleetResult<Vec<CreditTransaction>>;

    async fn get_leaderboard(
        &self,
        swarm_id: &str,
        order: LeaderboardOrder,
        limit: usize,
    ) -> FleetResult<Vec<LeaderboardEntry>>;
}
