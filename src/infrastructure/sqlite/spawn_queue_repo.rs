//! `SQLite` implementation of [`SpawnQueueRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::{Priority, SpawnPayload, SpawnQueueFilter, SpawnQueueItem, SpawnStatus};
use crate::domain::ports::SpawnQueueRepository;

#[derive(FromRow)]
struct SpawnQueueRow {
    id: String,
    requester_handle: String,
    target_agent_type: String,
    depth_level: i64,
    priority: String,
    status: String,
    depends_on: String,
    blocked_by_count: i64,
    payload: String,
    created_at: i64,
    processed_at: Option<i64>,
    spawned_worker_id: Option<String>,
}

impl TryFrom<SpawnQueueRow> for SpawnQueueItem {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: SpawnQueueRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::FleetError;

        Ok(SpawnQueueItem {
            id: row.id,
            requester_handle: row.requester_handle,
            target_agent_type: row.target_agent_type,
            depth_level: row.depth_level as u32,
            priority: Priority::from_str(&row.priority)
                .ok_or_else(|| FleetError::Internal(format!("unknown priority: {}", row.priority)))?,
            status: SpawnStatus::from_str(&row.status)
                .ok_or_else(|| FleetError::Internal(format!("unknown status: {}", row.status)))?,
            depends_on: serde_json::from_str(&row.depends_on)?,
            blocked_by_count: row.blocked_by_count as u32,
            payload: serde_json::from_str::<SpawnPayload>(&row.payload)?,
            created_at: row.created_at,
            processed_at: row.processed_at,
            spawned_worker_id: row.spawned_worker_id,
        })
    }
}

pub struct SqliteSpawnQueueRepository {
    pool: SqlitePool,
}

impl SqliteSpawnQueueRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpawnQueueRepository for SqliteSpawnQueueRepository {
    async fn enqueue(&self, item: &SpawnQueueItem) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO spawn_queue
                (id, requester_handle, target_agent_type, depth_level, priority, status,
                 depends_on, blocked_by_count, payload, created_at, processed_at, spawned_worker_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.requester_handle)
        .bind(&item.target_agent_type)
        .bind(i64::from(item.depth_level))
        .bind(item.priority.as_str())
        .bind(item.status.as_str())
        .bind(serde_json::to_string(&item.depends_on)?)
        .bind(i64::from(item.blocked_by_count))
        .bind(serde_json::to_string(&item.payload)?)
        .bind(item.created_at)
        .bind(item.processed_at)
        .bind(&item.spawned_worker_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<SpawnQueueItem>> {
        let row = sqlx::query_as::<_, SpawnQueueRow>("SELECT * FROM spawn_queue WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SpawnQueueItem::try_from).transpose()
    }

    async fn update(&self, item: &SpawnQueueItem) -> FleetResult<()> {
        sqlx::query(
            "UPDATE spawn_queue SET
                status = ?, blocked_by_count = ?, processed_at = ?, spawned_worker_id = ?
             WHERE id = ?",
        )
        .bind(item.status.as_str())
        .bind(i64::from(item.blocked_by_count))
        .bind(item.processed_at)
        .bind(&item.spawned_worker_id)
        .bind(&item.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, filter: SpawnQueueFilter) -> FleetResult<Vec<SpawnQueueItem>> {
        let mut sql = "SELECT * FROM spawn_queue WHERE 1=1".to_string();
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.requester_handle.is_some() {
            sql.push_str(" AND requester_handle = ?");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query_as::<_, SpawnQueueRow>(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str().to_string());
        }
        if let Some(requester) = filter.requester_handle {
            query = query.bind(requester);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(SpawnQueueItem::try_from).collect()
    }

    async fn list_ready(&self, limit: usize) -> FleetResult<Vec<SpawnQueueItem>> {
        let rows = sqlx::query_as::<_, SpawnQueueRow>(
            "SELECT * FROM spawn_queue
             WHERE status = 'pending' AND blocked_by_count = 0
             ORDER BY
                CASE priority
                    WHEN 'critical' THEN 0
                    WHEN 'high' THEN 1
                    WHEN 'normal' THEN 2
                    WHEN 'low' THEN 3
                END ASC,
                created_at ASC
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpawnQueueItem::try_from).collect()
    }

    async fn release_dependents(&self, completed_id: &str) -> FleetResult<u64> {
        let rows = sqlx::query_as::<_, SpawnQueueRow>(
            "SELECT * FROM spawn_queue WHERE depends_on LIKE ?",
        )
        .bind(format!("%{completed_id}%"))
        .fetch_all(&self.pool)
        .await?;

        let mut released = 0u64;
        for row in rows {
            let item = SpawnQueueItem::try_from(row)?;
            if !item.depends_on.iter().any(|d| d == completed_id) {
                continue;
            }
            let new_count = item.blocked_by_count.saturating_sub(1);
            sqlx::query("UPDATE spawn_queue SET blocked_by_count = ? WHERE id = ?")
                .bind(i64::from(new_count))
                .bind(&item.id)
                .execute(&self.pool)
                .await?;
            released += 1;
        }
        Ok(released)
    }
}
