//! Credits: per-`(swarm, agent)` balance and reputation ledger.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{CreditAccount, CreditTransaction, LeaderboardEntry, LeaderboardOrder, TransactionKind};
use crate::domain::ports::{Clock, CreditRepository};
use crate::services::push_hub::{Event, PushHub, Subject};

pub struct CreditsService<R, C>
where
    R: CreditRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<R>,
    clock: Arc<C>,
    push_hub: PushHub,
}

impl<R, C> CreditsService<R, C>
where
    R: CreditRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<R>, clock: Arc<C>, push_hub: PushHub) -> Self {
        Self { repo, clock, push_hub }
    }

    /// Idempotent: the repository inserts a zeroed account on first call.
    pub async fn get_or_create(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<CreditAccount> {
        self.repo.get_or_create(swarm_id, agent_handle).await
    }

    /// Apply a single-leg transaction (`earn`/`spend`/`bonus`/`penalty`) to
    /// one account's balance. `spend`/`penalty` fail with
    /// `InsufficientBalance` rather than driving the balance negative.
    pub async fn record_transaction(
        &self,
        swarm_id: &str,
        agent_handle: &str,
        kind: TransactionKind,
        amount: f64,
        reason: Option<String>,
    ) -> FleetResult<CreditAccount> {
        let mut account = self.repo.get_or_create(swarm_id, agent_handle).await?;
        let delta = kind.signed_delta(amount);
        if account.balance + delta < 0.0 {
            return Err(FleetError::InsufficientBalance { balance: account.balance, requested: amount });
        }
        account.balance += delta;
        if matches!(kind, TransactionKind::Earn | TransactionKind::Bonus) {
            account.total_earned += amount;
        }
        self.repo.save_account(&account).await?;

        let now = self.clock.now_ms();
        self.repo
            .record_transaction(&CreditTransaction {
                id: Uuid::new_v4().to_string(),
                swarm_id: swarm_id.to_string(),
                agent_handle: agent_handle.to_string(),
                kind,
                amount,
                reason,
                created_at: now,
            })
            .await?;
        Ok(account)
    }

    /// Atomic two-leg transfer: `a`'s balance decreases by `amount`, `b`'s
    /// increases by the same, or neither changes.
    pub async fn transfer(&self, swarm_id: &str, from_handle: &str, to_handle: &str, amount: f64) -> FleetResult<()> {
        let mut from = self.repo.get_or_create(swarm_id, from_handle).await?;
        if from.balance < amount {
            return Err(FleetError::InsufficientBalance { balance: from.balance, requested: amount });
        }
        let mut to = self.repo.get_or_create(swarm_id, to_handle).await?;
        from.balance -= amount;
        to.balance += amount;
        to.total_earned += amount;

        self.repo.save_account(&from).await?;
        self.repo.save_account(&to).await?;

        let now = self.clock.now_ms();
        self.repo
            .record_transaction(&CreditTransaction {
                id: Uuid::new_v4().to_string(),
                swarm_id: swarm_id.to_string(),
                agent_handle: from_handle.to_string(),
                kind: TransactionKind::Spend,
                amount,
                reason: Some(format!("transfer to {to_handle}")),
                created_at: now,
            })
            .await?;
        self.repo
            .record_transaction(&CreditTransaction {
                id: Uuid::new_v4().to_string(),
                swarm_id: swarm_id.to_string(),
                agent_handle: to_handle.to_string(),
                kind: TransactionKind::Earn,
                amount,
                reason: Some(format!("transfer from {from_handle}")),
                created_at: now,
            })
            .await?;

        self.push_hub
            .publish(
                Subject::Swarm(swarm_id.to_string()),
                Event::CreditsTransfer { from_handle: from_handle.to_string(), to_handle: to_handle.to_string(), amount },
            )
            .await;
        Ok(())
    }

    /// Reputation update rule: success moves the score toward 1, failure
    /// toward 0, scaled by `weight`; bounded to `[0, 1]`.
    pub async fn apply_reputation_event(&self, swarm_id: &str, agent_handle: &str, success: bool, weight: f64) -> FleetResult<CreditAccount> {
        let mut account = self.repo.get_or_create(swarm_id, agent_handle).await?;
        account.apply_reputation_event(success, weight);
        account.task_count += 1;
        if success {
            account.success_count += 1;
        }
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    pub async fn get_leaderboard(&self, swarm_id: &str, order: LeaderboardOrder, limit: usize) -> FleetResult<Vec<LeaderboardEntry>> {
        self.repo.get_leaderboard(swarm_id, order, limit).await
    }

    pub async fn get_transaction_history(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<Vec<CreditTransaction>> {
        self.repo.list_transactions(swarm_id, agent_handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCreditRepo {
        accounts: Mutex<HashMap<(String, String), CreditAccount>>,
        transactions: Mutex<Vec<CreditTransaction>>,
    }

    #[async_trait]
    impl CreditRepository for FakeCreditRepo {
        async fn get_or_create(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<CreditAccount> {
            let key = (swarm_id.to_string(), agent_handle.to_string());
            let mut guard = self.accounts.lock().unwrap();
            Ok(guard.entry(key).or_insert_with(|| CreditAccount::zeroed(swarm_id.into(), agent_handle.into())).clone())
        }
        async fn save_account(&self, account: &CreditAccount) -> FleetResult<()> {
            self.accounts
                .lock()
                .unwrap()
                .insert((account.swarm_id.clone(), account.agent_handle.clone()), account.clone());
            Ok(())
        }
        async fn record_transaction(&self, transaction: &CreditTransaction) -> FleetResult<()> {
            self.transactions.lock().unwrap().push(transaction.clone());
            Ok(())
        }
        async fn list_transactions(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<Vec<CreditTransaction>> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.swarm_id == swarm_id && t.agent_handle == agent_handle)
                .cloned()
                .collect())
        }
        async fn get_leaderboard(&self, _swarm_id: &str, _order: LeaderboardOrder, _limit: usize) -> FleetResult<Vec<LeaderboardEntry>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn transfer_preserves_total_balance() {
        let repo = Arc::new(FakeCreditRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = CreditsService::new(repo.clone(), clock, PushHub::default());

        service.record_transaction("s1", "alice", TransactionKind::Earn, 100.0, None).await.unwrap();
        service.transfer("s1", "alice", "bob", 30.0).await.unwrap();

        let alice = service.get_or_create("s1", "alice").await.unwrap();
        let bob = service.get_or_create("s1", "bob").await.unwrap();
        assert_eq!(alice.balance, 70.0);
        assert_eq!(bob.balance, 30.0);
    }

    #[tokio::test]
    async fn transfer_fails_atomically_on_insufficient_funds() {
        let repo = Arc::new(FakeCreditRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = CreditsService::new(repo, clock, PushHub::default());

        let err = service.transfer("s1", "alice", "bob", 50.0).await.unwrap_err();
        assert!(matches!(err, FleetError::InsufficientBalance { .. }));
        let alice = service.get_or_create("s1", "alice").await.unwrap();
        let bob = service.get_or_create("s1", "bob").await.unwrap();
        assert_eq!(alice.balance, 0.0);
        assert_eq!(bob.balance, 0.0);
    }

    #[tokio::test]
    async fn reputation_event_rule_matches_spec_example() {
        let repo = Arc::new(FakeCreditRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = CreditsService::new(repo, clock, PushHub::default());

        let mut account = CreditAccount::zeroed("s1".into(), "alice".into());
        account.reputation_score = 0.5;
        service.repo.save_account(&account).await.unwrap();

        let after_success = service.apply_reputation_event("s1", "alice", true, 0.1).await.unwrap();
        assert!((after_success.reputation_score - 0.55).abs() < 1e-9);

        let after_failure = service.apply_reputation_event("s1", "alice", false, 0.1).await.unwrap();
        assert!((after_failure.reputation_score - 0.495).abs() < 1e-9);
    }
}
