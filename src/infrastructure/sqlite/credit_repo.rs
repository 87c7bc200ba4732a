//! `SQLite` implementation of [`CreditRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::{
    CreditAccount, CreditTransaction, LeaderboardEntry, LeaderboardOrder, TransactionKind,
};
use crate::domain::ports::CreditRepository;

#[derive(FromRow)]
struct CreditAccountRow {
    swarm_id: String,
    agent_handle: String,
    balance: f64,
    reputation_score: f64,
    total_earned: f64,
    task_count: i64,
    success_count: i64,
}

impl From<CreditAccountRow> for CreditAccount {
    fn from(row: CreditAccountRow) -> Self {
        CreditAccount {
            swarm_id: row.swarm_id,
            agent_handle: row.agent_handle,
            balance: row.balance,
            reputation_score: row.reputation_score,
            total_earned: row.total_earned,
            task_count: row.task_count as u64,
            success_count: row.success_count as u64,
        }
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: String,
    swarm_id: String,
    agent_handle: String,
    kind: String,
    amount: f64,
    reason: Option<String>,
    created_at: i64,
}

impl TryFrom<TransactionRow> for CreditTransaction {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::FleetError;

        let kind = match row.kind.as_str() {
            "earn" => TransactionKind::Earn,
            "spend" => TransactionKind::Spend,
            "bonus" => TransactionKind::Bonus,
            "penalty" => TransactionKind::Penalty,
            other => return Err(FleetError::Internal(format!("unknown transaction kind: {other}"))),
        };

        Ok(CreditTransaction {
            id: row.id,
            swarm_id: row.swarm_id,
            agent_handle: row.agent_handle,
            kind,
            amount: row.amount,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

fn kind_as_str(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Earn => "earn",
        TransactionKind::Spend => "spend",
        TransactionKind::Bonus => "bonus",
        TransactionKind::Penalty => "penalty",
    }
}

pub struct SqliteCreditRepository {
    pool: SqlitePool,
}

impl SqliteCreditRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditRepository for SqliteCreditRepository {
    async fn get_or_create(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<CreditAccount> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, CreditAccountRow>(
            "SELECT * FROM credit_accounts WHERE swarm_id = ? AND agent_handle = ?",
        )
        .bind(swarm_id)
        .bind(agent_handle)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            tx.commit().await?;
            return Ok(row.into());
        }

        let fresh = CreditAccount::zeroed(swarm_id.to_string(), agent_handle.to_string());
        sqlx::query(
            "INSERT INTO credit_accounts
                (swarm_id, agent_handle, balance, reputation_score, total_earned, task_count, success_count)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fresh.swarm_id)
        .bind(&fresh.agent_handle)
        .bind(fresh.balance)
        .bind(fresh.reputation_score)
        .bind(fresh.total_earned)
        .bind(i64::try_from(fresh.task_count).unwrap_or(i64::MAX))
        .bind(i64::try_from(fresh.success_count).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(fresh)
    }

    async fn save_account(&self, account: &CreditAccount) -> FleetResult<()> {
        sqlx::query(
            "UPDATE credit_accounts
             SET balance = ?, reputation_score = ?, total_earned = ?, task_count = ?, success_count = ?
             WHERE swarm_id = ? AND agent_handle = ?",
        )
        .bind(account.balance)
        .bind(account.reputation_score)
        .bind(account.total_earned)
        .bind(i64::try_from(account.task_count).unwrap_or(i64::MAX))
        .bind(i64::try_from(account.success_count).unwrap_or(i64::MAX))
        .bind(&account.swarm_id)
        .bind(&account.agent_handle)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_transaction(&self, transaction: &CreditTransaction) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO credit_transactions (id, swarm_id, agent_handle, kind, amount, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&transaction.id)
        .bind(&transaction.swarm_id)
        .bind(&transaction.agent_handle)
        .bind(kind_as_str(transaction.kind))
        .bind(transaction.amount)
        .bind(&transaction.reason)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_transactions(
        &self,
        swarm_id: &str,
        agent_handle: &str,
    ) -> FleetResult<Vec<CreditTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM credit_transactions
             WHERE swarm_id = ? AND agent_handle = ?
             ORDER BY created_at ASC",
        )
        .bind(swarm_id)
        .bind(agent_handle)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CreditTransaction::try_from).collect()
    }

    async fn get_leaderboard(
        &self,
        swarm_id: &str,
        order: LeaderboardOrder,
        limit: usize,
    ) -> FleetResult<Vec<LeaderboardEntry>> {
        let column = match order {
            LeaderboardOrder::Balance => "balance",
            LeaderboardOrder::Reputation => "reputation_score",
            LeaderboardOrder::TotalEarned => "total_earned",
        };
        let sql = format!(
            "SELECT agent_handle, balance, reputation_score, total_earned
             FROM credit_accounts WHERE swarm_id = ? ORDER BY {column} DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, CreditAccountRow>(&sql)
            .bind(swarm_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                agent_handle: row.agent_handle,
                balance: row.balance,
                reputation_score: row.reputation_score,
                total_earned: row.total_earned,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> SqliteCreditRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        SqliteCreditRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let repo = repo().await;
        let first = repo.get_or_create("s", "alpha").await.unwrap();
        assert_eq!(first.balance, 0.0);

        let mut updated = first.clone();
        updated.balance = 42.0;
        repo.save_account(&updated).await.unwrap();

        let second = repo.get_or_create("s", "alpha").await.unwrap();
        assert_eq!(second.balance, 42.0, "second call must not reset the existing row");
    }

    #[tokio::test]
    async fn leaderboard_orders_by_requested_column() {
        let repo = repo().await;
        let mut a = repo.get_or_create("s", "alpha").await.unwrap();
        a.balance = 10.0;
        repo.save_account(&a).await.unwrap();
        let mut b = repo.get_or_create("s", "beta").await.unwrap();
        b.balance = 50.0;
        repo.save_account(&b).await.unwrap();

        let board = repo.get_leaderboard("s", LeaderboardOrder::Balance, 10).await.unwrap();
        assert_eq!(board[0].agent_handle, "beta");
        assert_eq!(board[1].agent_handle, "alpha");
    }
}
