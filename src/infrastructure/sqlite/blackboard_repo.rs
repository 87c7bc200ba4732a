//! `SQLite` implementation of [`BlackboardRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;

use crate::domain::errors::FleetResult;
use crate::domain::models::{BlackboardFilter, BlackboardMessage, MessageType, Priority};
use crate::domain::ports::BlackboardRepository;

#[derive(FromRow)]
struct MessageRow {
    id: String,
    swarm_id: String,
    sender_handle: String,
    message_type: String,
    target_handle: Option<String>,
    priority: String,
    payload: String,
    read_by: String,
    created_at: i64,
    archived_at: Option<i64>,
}

impl TryFrom<MessageRow> for BlackboardMessage {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::FleetError;

        let read_by: HashSet<String> = serde_json::from_str(&row.read_by)?;
        Ok(BlackboardMessage {
            id: row.id,
            swarm_id: row.swarm_id,
            sender_handle: row.sender_handle,
            message_type: MessageType::from_str(&row.message_type).ok_or_else(|| {
                FleetError::Internal(format!("unknown message_type: {}", row.message_type))
            })?,
            target_handle: row.target_handle,
            priority: Priority::from_str(&row.priority)
                .ok_or_else(|| FleetError::Internal(format!("unknown priority: {}", row.priority)))?,
            payload: serde_json::from_str(&row.payload)?,
            read_by,
            created_at: row.created_at,
            archived_at: row.archived_at,
        })
    }
}

pub struct SqliteBlackboardRepository {
    pool: SqlitePool,
}

impl SqliteBlackboardRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlackboardRepository for SqliteBlackboardRepository {
    async fn post(&self, message: &BlackboardMessage) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO blackboard_messages
                (id, swarm_id, sender_handle, message_type, target_handle, priority, payload,
                 read_by, created_at, archived_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.swarm_id)
        .bind(&message.sender_handle)
        .bind(message.message_type.as_str())
        .bind(&message.target_handle)
        .bind(message.priority.as_str())
        .bind(serde_json::to_string(&message.payload)?)
        .bind(serde_json::to_string(&message.read_by)?)
        .bind(message.created_at)
        .bind(message.archived_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<BlackboardMessage>> {
        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM blackboard_messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BlackboardMessage::try_from).transpose()
    }

    async fn update(&self, message: &BlackboardMessage) -> FleetResult<()> {
        sqlx::query(
            "UPDATE blackboard_messages SET read_by = ?, archived_at = ? WHERE id = ?",
        )
        .bind(serde_json::to_string(&message.read_by)?)
        .bind(message.archived_at)
        .bind(&message.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, filter: BlackboardFilter) -> FleetResult<Vec<BlackboardMessage>> {
        let mut sql = "SELECT * FROM blackboard_messages WHERE 1=1".to_string();
        if filter.swarm_id.is_some() {
            sql.push_str(" AND swarm_id = ?");
        }
        if filter.target_handle.is_some() {
            sql.push_str(" AND (target_handle = ? OR target_handle IS NULL)");
        }
        if filter.message_type.is_some() {
            sql.push_str(" AND message_type = ?");
        }
        if !filter.include_archived {
            sql.push_str(" AND archived_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query_as::<_, MessageRow>(&sql);
        if let Some(swarm_id) = filter.swarm_id {
            query = query.bind(swarm_id);
        }
        if let Some(target) = filter.target_handle {
            query = query.bind(target);
        }
        if let Some(mt) = filter.message_type {
            query = query.bind(mt.as_str().to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(BlackboardMessage::try_from).collect()
    }

    async fn archive(&self, id: &str, archived_at: i64) -> FleetResult<()> {
        sqlx::query("UPDATE blackboard_messages SET archived_at = ? WHERE id = ?")
            .bind(archived_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    #[tokio::test]
    async fn archive_excludes_from_default_listing() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = SqliteBlackboardRepository::new(db.pool().clone());

        let msg = BlackboardMessage::new(
            "m1".into(),
            "swarm".into(),
            "alpha".into(),
            MessageType::Status,
            None,
            Priority::Normal,
            serde_json::json!({}),
            0,
        );
        repo.post(&msg).await.unwrap();

        assert_eq!(repo.list(BlackboardFilter::default()).await.unwrap().len(), 1);
        repo.archive("m1", 100).await.unwrap();
        assert_eq!(repo.list(BlackboardFilter::default()).await.unwrap().len(), 0);

        let including = BlackboardFilter {
            include_archived: true,
            ..Default::default()
        };
        assert_eq!(repo.list(including).await.unwrap().len(), 1);
    }
}
