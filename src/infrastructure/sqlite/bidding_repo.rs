//! `SQLite` implementation of [`BiddingRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{BidStatus, TaskBid};
use crate::domain::ports::BiddingRepository;

#[derive(FromRow)]
struct BidRow {
    id: String,
    task_id: String,
    bidder_handle: String,
    amount: f64,
    confidence: f64,
    status: String,
    created_at: i64,
}

impl TryFrom<BidRow> for TaskBid {
    type Error = FleetError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        Ok(TaskBid {
            id: row.id,
            task_id: row.task_id,
            bidder_handle: row.bidder_handle,
            amount: row.amount,
            confidence: row.confidence,
            status: BidStatus::from_str(&row.status)
                .ok_or_else(|| FleetError::Internal(format!("unknown bid status: {}", row.status)))?,
            created_at: row.created_at,
        })
    }
}

pub struct SqliteBiddingRepository {
    pool: SqlitePool,
}

impl SqliteBiddingRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BiddingRepository for SqliteBiddingRepository {
    async fn submit_bid(&self, bid: &TaskBid) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO task_bids (id, task_id, bidder_handle, amount, confidence, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (task_id, bidder_handle) WHERE status = 'pending'
             DO UPDATE SET amount = excluded.amount, confidence = excluded.confidence, created_at = excluded.created_at",
        )
        .bind(&bid.id)
        .bind(&bid.task_id)
        .bind(&bid.bidder_handle)
        .bind(bid.amount)
        .bind(bid.confidence)
        .bind(bid.status.as_str())
        .bind(bid.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_bid(&self, id: &str) -> FleetResult<Option<TaskBid>> {
        let row = sqlx::query_as::<_, BidRow>("SELECT * FROM task_bids WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TaskBid::try_from).transpose()
    }

    async fn list_bids(&self, task_id: &str, status: Option<BidStatus>) -> FleetResult<Vec<TaskBid>> {
        let rows = match status {
            Some(s) => {
                sqlx::query_as::<_, BidRow>(
                    "SELECT * FROM task_bids WHERE task_id = ? AND status = ? ORDER BY created_at ASC",
                )
                .bind(task_id)
                .bind(s.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BidRow>("SELECT * FROM task_bids WHERE task_id = ? ORDER BY created_at ASC")
                    .bind(task_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(TaskBid::try_from).collect()
    }

    async fn accept_bid(&self, task_id: &str, winning_bid_id: &str) -> FleetResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE task_bids SET status = 'accepted' WHERE id = ? AND task_id = ?")
            .bind(winning_bid_id)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE task_bids SET status = 'rejected' WHERE task_id = ? AND status = 'pending' AND id != ?")
            .bind(task_id)
            .bind(winning_bid_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> SqliteBiddingRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        SqliteBiddingRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn repeat_pending_bid_upserts_instead_of_duplicating() {
        let repo = repo().await;
        repo.submit_bid(&TaskBid::new("b1".into(), "t1".into(), "alpha".into(), 10.0, 0.5, 0)).await.unwrap();
        repo.submit_bid(&TaskBid::new("b2".into(), "t1".into(), "alpha".into(), 5.0, 0.6, 1)).await.unwrap();

        let bids = repo.list_bids("t1", None).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].amount, 5.0);
    }

    #[tokio::test]
    async fn accept_bid_leaves_exactly_one_accepted_and_rejects_the_rest() {
        let repo = repo().await;
        repo.submit_bid(&TaskBid::new("b1".into(), "t1".into(), "alpha".into(), 10.0, 0.5, 0)).await.unwrap();
        repo.submit_bid(&TaskBid::new("b2".into(), "t1".into(), "beta".into(), 8.0, 0.5, 1)).await.unwrap();
        repo.submit_bid(&TaskBid::new("b3".into(), "t1".into(), "gamma".into(), 6.0, 0.5, 2)).await.unwrap();

        repo.accept_bid("t1", "b1").await.unwrap();

        let accepted = repo.list_bids("t1", Some(BidStatus::Accepted)).await.unwrap();
        let rejected = repo.list_bids("t1", Some(BidStatus::Rejected)).await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, "b1");
        assert_eq!(rejected.len(), 2);
    }

    #[tokio::test]
    async fn a_new_bid_can_be_submitted_after_the_prior_pending_one_is_terminal() {
        let repo = repo().await;
        repo.submit_bid(&TaskBid::new("b1".into(), "t1".into(), "alpha".into(), 10.0, 0.5, 0)).await.unwrap();
        repo.accept_bid("t1", "b1").await.unwrap();
        repo.submit_bid(&TaskBid::new("b2".into(), "t1".into(), "alpha".into(), 20.0, 0.5, 1)).await.unwrap();

        let bids = repo.list_bids("t1", None).await.unwrap();
        assert_eq!(bids.len(), 2);
    }
}
