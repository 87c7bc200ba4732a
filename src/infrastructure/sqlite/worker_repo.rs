//! `SQLite` implementation of [`WorkerRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::{Health, Role, SpawnMode, Worker, WorkerFilter, WorkerState};
use crate::domain::ports::WorkerRepository;

#[derive(FromRow)]
struct WorkerRow {
    id: String,
    handle: String,
    team_name: String,
    role: String,
    state: String,
    health: String,
    pid: Option<i64>,
    session_id: Option<String>,
    worktree_path: Option<String>,
    branch: Option<String>,
    swarm_id: Option<String>,
    depth_level: i64,
    restart_count: i64,
    last_heartbeat: i64,
    spawned_at: i64,
    dismissed_at: Option<i64>,
    spawn_mode: String,
}

impl TryFrom<WorkerRow> for Worker {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: WorkerRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::FleetError;

        Ok(Worker {
            id: row.id,
            handle: row.handle,
            team_name: row.team_name,
            role: Role::from_str(&row.role)
                .ok_or_else(|| FleetError::Internal(format!("unknown role: {}", row.role)))?,
            state: WorkerState::from_str(&row.state)
                .ok_or_else(|| FleetError::Internal(format!("unknown state: {}", row.state)))?,
            health: Health::from_str(&row.health)
                .ok_or_else(|| FleetError::Internal(format!("unknown health: {}", row.health)))?,
            pid: row.pid.map(|p| p as u32),
            session_id: row.session_id,
            worktree_path: row.worktree_path,
            branch: row.branch,
            swarm_id: row.swarm_id,
            depth_level: row.depth_level as u32,
            restart_count: row.restart_count as u32,
            last_heartbeat: row.last_heartbeat,
            spawned_at: row.spawned_at,
            dismissed_at: row.dismissed_at,
            spawn_mode: SpawnMode::from_str(&row.spawn_mode).ok_or_else(|| {
                FleetError::Internal(format!("unknown spawn_mode: {}", row.spawn_mode))
            })?,
            recent_output: Default::default(),
        })
    }
}

pub struct SqliteWorkerRepository {
    pool: SqlitePool,
}

impl SqliteWorkerRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerRepository for SqliteWorkerRepository {
    async fn create(&self, worker: &Worker) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO workers
                (id, handle, team_name, role, state, health, pid, session_id, worktree_path,
                 branch, swarm_id, depth_level, restart_count, last_heartbeat, spawned_at,
                 dismissed_at, spawn_mode)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&worker.id)
        .bind(&worker.handle)
        .bind(&worker.team_name)
        .bind(worker.role.as_str())
        .bind(worker.state.as_str())
        .bind(worker.health.as_str())
        .bind(worker.pid.map(i64::from))
        .bind(&worker.session_id)
        .bind(&worker.worktree_path)
        .bind(&worker.branch)
        .bind(&worker.swarm_id)
        .bind(i64::from(worker.depth_level))
        .bind(i64::from(worker.restart_count))
        .bind(worker.last_heartbeat)
        .bind(worker.spawned_at)
        .bind(worker.dismissed_at)
        .bind(worker.spawn_mode.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<Worker>> {
        let row = sqlx::query_as::<_, WorkerRow>("SELECT * FROM workers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Worker::try_from).transpose()
    }

    async fn get_by_handle(&self, handle: &str) -> FleetResult<Option<Worker>> {
        let row = sqlx::query_as::<_, WorkerRow>(
            "SELECT * FROM workers WHERE handle = ? AND state != 'dismissed'",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Worker::try_from).transpose()
    }

    async fn update(&self, worker: &Worker) -> FleetResult<()> {
        sqlx::query(
            "UPDATE workers SET
                state = ?, health = ?, pid = ?, session_id = ?, worktree_path = ?, branch = ?,
                swarm_id = ?, restart_count = ?, last_heartbeat = ?, dismissed_at = ?
             WHERE id = ?",
        )
        .bind(worker.state.as_str())
        .bind(worker.health.as_str())
        .bind(worker.pid.map(i64::from))
        .bind(&worker.session_id)
        .bind(&worker.worktree_path)
        .bind(&worker.branch)
        .bind(&worker.swarm_id)
        .bind(i64::from(worker.restart_count))
        .bind(worker.last_heartbeat)
        .bind(worker.dismissed_at)
        .bind(&worker.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, filter: WorkerFilter) -> FleetResult<Vec<Worker>> {
        let mut sql = "SELECT * FROM workers WHERE 1=1".to_string();
        if filter.state.is_some() {
            sql.push_str(" AND state = ?");
        }
        if filter.role.is_some() {
            sql.push_str(" AND role = ?");
        }
        if filter.swarm_id.is_some() {
            sql.push_str(" AND swarm_id = ?");
        }
        sql.push_str(" ORDER BY spawned_at ASC");

        let mut query = sqlx::query_as::<_, WorkerRow>(&sql);
        if let Some(state) = filter.state {
            query = query.bind(state.as_str().to_string());
        }
        if let Some(role) = filter.role {
            query = query.bind(role.as_str().to_string());
        }
        if let Some(swarm_id) = filter.swarm_id {
            query = query.bind(swarm_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Worker::try_from).collect()
    }

    async fn handle_in_use(&self, handle: &str) -> FleetResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workers WHERE handle = ? AND state != 'dismissed'",
        )
        .bind(handle)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    async fn count_live_in_swarm(&self, swarm_id: &str) -> FleetResult<u32> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workers WHERE swarm_id = ? AND state != 'dismissed'",
        )
        .bind(swarm_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 as u32)
    }

    async fn count_restarts_since(&self, since_ms: i64) -> FleetResult<u64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(restart_count), 0) FROM workers WHERE last_heartbeat >= ?",
        )
        .bind(since_ms)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 as u64)
    }
}
