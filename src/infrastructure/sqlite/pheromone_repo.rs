//! `SQLite` implementation of [`PheromoneRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, Row, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::{PheromoneFilter, PheromoneTrail, ResourceActivity};
use crate::domain::ports::PheromoneRepository;

#[derive(FromRow)]
struct PheromoneRow {
    id: String,
    swarm_id: String,
    depositor_handle: String,
    resource_id: String,
    resource_type: String,
    trail_type: String,
    intensity: f64,
    metadata: Option<String>,
    created_at: i64,
}

impl TryFrom<PheromoneRow> for PheromoneTrail {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: PheromoneRow) -> Result<Self, Self::Error> {
        Ok(PheromoneTrail {
            id: row.id,
            swarm_id: row.swarm_id,
            depositor_handle: row.depositor_handle,
            resource_id: row.resource_id,
            resource_type: row.resource_type,
            trail_type: row.trail_type,
            intensity: row.intensity,
            metadata: row.metadata.map(|m| serde_json::from_str(&m)).transpose()?,
            created_at: row.created_at,
        })
    }
}

pub struct SqlitePheromoneRepository {
    pool: SqlitePool,
}

impl SqlitePheromoneRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PheromoneRepository for SqlitePheromoneRepository {
    async fn deposit(&self, trail: &PheromoneTrail) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO pheromone_trails
                (id, swarm_id, depositor_handle, resource_id, resource_type, trail_type,
                 intensity, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trail.id)
        .bind(&trail.swarm_id)
        .bind(&trail.depositor_handle)
        .bind(&trail.resource_id)
        .bind(&trail.resource_type)
        .bind(&trail.trail_type)
        .bind(trail.intensity)
        .bind(
            trail
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(trail.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, filter: PheromoneFilter) -> FleetResult<Vec<PheromoneTrail>> {
        let mut sql = "SELECT * FROM pheromone_trails WHERE 1=1".to_string();
        if filter.swarm_id.is_some() {
            sql.push_str(" AND swarm_id = ?");
        }
        if filter.resource_id.is_some() {
            sql.push_str(" AND resource_id = ?");
        }
        if filter.resource_type.is_some() {
            sql.push_str(" AND resource_type = ?");
        }
        if filter.trail_type.is_some() {
            sql.push_str(" AND trail_type = ?");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query_as::<_, PheromoneRow>(&sql);
        if let Some(swarm_id) = filter.swarm_id {
            query = query.bind(swarm_id);
        }
        if let Some(resource_id) = filter.resource_id {
            query = query.bind(resource_id);
        }
        if let Some(resource_type) = filter.resource_type {
            query = query.bind(resource_type);
        }
        if let Some(trail_type) = filter.trail_type {
            query = query.bind(trail_type);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(PheromoneTrail::try_from).collect()
    }

    async fn decay_all(&self, rate: f64, min_intensity: f64) -> FleetResult<(usize, usize)> {
        let mut tx = self.pool.begin().await?;

        let decayed = sqlx::query("UPDATE pheromone_trails SET intensity = intensity * ?")
            .bind(1.0 - rate)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;

        let removed = sqlx::query("DELETE FROM pheromone_trails WHERE intensity < ?")
            .bind(min_intensity)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;

        tx.commit().await?;
        Ok((decayed, removed))
    }

    async fn get_activity(&self, swarm_id: &str, limit: usize) -> FleetResult<Vec<ResourceActivity>> {
        let rows = sqlx::query(
            "SELECT resource_id, resource_type, SUM(intensity) AS total_intensity, COUNT(*) AS trail_count
             FROM pheromone_trails
             WHERE swarm_id = ?
             GROUP BY resource_id, resource_type
             ORDER BY total_intensity DESC
             LIMIT ?",
        )
        .bind(swarm_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ResourceActivity {
                resource_id: row.get("resource_id"),
                resource_type: row.get("resource_type"),
                total_intensity: row.get("total_intensity"),
                trail_count: row.get::<i64, _>("trail_count") as usize,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> SqlitePheromoneRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        sqlx::query("INSERT INTO swarms (id, name, max_agents, created_at) VALUES ('s', 'swarm', 5, 0)")
            .execute(db.pool())
            .await
            .unwrap();
        SqlitePheromoneRepository::new(db.pool().clone())
    }

    fn trail(id: &str, resource: &str, intensity: f64) -> PheromoneTrail {
        PheromoneTrail::new(
            id.into(),
            "s".into(),
            "alpha".into(),
            resource.into(),
            "file".into(),
            "success".into(),
            intensity,
            0,
        )
    }

    #[tokio::test]
    async fn decay_all_applies_rate_and_removes_below_floor() {
        let repo = repo().await;
        repo.deposit(&trail("t1", "r1", 100.0)).await.unwrap();
        repo.deposit(&trail("t2", "r2", 1.0)).await.unwrap();

        let (decayed, removed) = repo.decay_all(0.5, 1.0).await.unwrap();
        assert_eq!(decayed, 2);
        assert_eq!(removed, 1);

        let remaining = repo.query(PheromoneFilter::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "t1");
        assert!((remaining[0].intensity - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_activity_ranks_by_aggregate_intensity() {
        let repo = repo().await;
        repo.deposit(&trail("t1", "r1", 10.0)).await.unwrap();
        repo.deposit(&trail("t2", "r1", 5.0)).await.unwrap();
        repo.deposit(&trail("t3", "r2", 100.0)).await.unwrap();

        let activity = repo.get_activity("s", 10).await.unwrap();
        assert_eq!(activity[0].resource_id, "r2");
        assert_eq!(activity[1].resource_id, "r1");
        assert!((activity[1].total_intensity - 15.0).abs() < 1e-9);
        assert_eq!(activity[1].trail_count, 2);
    }
}
