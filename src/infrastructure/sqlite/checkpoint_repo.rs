//! `SQLite` implementation of [`CheckpointRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::{Checkpoint, CheckpointBody, CheckpointStatus};
use crate::domain::ports::CheckpointRepository;

#[derive(FromRow)]
struct CheckpointRow {
    id: String,
    from_handle: String,
    to_handle: String,
    body: String,
    status: String,
    created_at: i64,
}

impl TryFrom<CheckpointRow> for Checkpoint {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::FleetError;

        Ok(Checkpoint {
            id: row.id,
            from_handle: row.from_handle,
            to_handle: row.to_handle,
            body: serde_json::from_str::<CheckpointBody>(&row.body)?,
            status: CheckpointStatus::from_str(&row.status)
                .ok_or_else(|| FleetError::Internal(format!("unknown status: {}", row.status)))?,
            created_at: row.created_at,
        })
    }
}

pub struct SqliteCheckpointRepository {
    pool: SqlitePool,
}

impl SqliteCheckpointRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointRepository for SqliteCheckpointRepository {
    async fn create(&self, checkpoint: &Checkpoint) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO checkpoints (id, from_handle, to_handle, body, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint.id)
        .bind(&checkpoint.from_handle)
        .bind(&checkpoint.to_handle)
        .bind(serde_json::to_string(&checkpoint.body)?)
        .bind(checkpoint.status.as_str())
        .bind(checkpoint.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<Checkpoint>> {
        let row = sqlx::query_as::<_, CheckpointRow>("SELECT * FROM checkpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Checkpoint::try_from).transpose()
    }

    async fn update(&self, checkpoint: &Checkpoint) -> FleetResult<()> {
        sqlx::query("UPDATE checkpoints SET status = ? WHERE id = ?")
            .bind(checkpoint.status.as_str())
            .bind(&checkpoint.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_handle(&self, handle: &str) -> FleetResult<Vec<Checkpoint>> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            "SELECT * FROM checkpoints WHERE to_handle = ? ORDER BY created_at ASC",
        )
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Checkpoint::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> SqliteCheckpointRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        SqliteCheckpointRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn create_get_and_update_status() {
        let repo = repo().await;
        let cp = Checkpoint::new(
            "cp1".into(),
            "alpha".into(),
            "beta".into(),
            CheckpointBody {
                goal: "ship the feature".into(),
                ..Default::default()
            },
            0,
        );
        repo.create(&cp).await.unwrap();

        let fetched = repo.get("cp1").await.unwrap().unwrap();
        assert_eq!(fetched.body.goal, "ship the feature");
        assert_eq!(fetched.status, CheckpointStatus::Pending);

        let mut accepted = fetched;
        accepted.status = CheckpointStatus::Accepted;
        repo.update(&accepted).await.unwrap();
        assert_eq!(
            repo.get("cp1").await.unwrap().unwrap().status,
            CheckpointStatus::Accepted
        );
    }

    #[tokio::test]
    async fn list_for_handle_scopes_to_recipient_ordered_by_age() {
        let repo = repo().await;
        let mut first = Checkpoint::new("cp1".into(), "a".into(), "beta".into(), CheckpointBody::default(), 5);
        first.created_at = 5;
        let mut second = Checkpoint::new("cp2".into(), "a".into(), "beta".into(), CheckpointBody::default(), 1);
        second.created_at = 1;
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();
        repo.create(&Checkpoint::new("cp3".into(), "a".into(), "gamma".into(), CheckpointBody::default(), 0))
            .await
            .unwrap();

        let listed = repo.list_for_handle("beta").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "cp2");
        assert_eq!(listed[1].id, "cp1");
    }
}
