//! `SQLite` implementation of [`SwarmRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::Swarm;
use crate::domain::ports::SwarmRepository;

#[derive(FromRow)]
struct SwarmRow {
    id: String,
    name: String,
    description: Option<String>,
    max_agents: i64,
    created_at: i64,
}

impl From<SwarmRow> for Swarm {
    fn from(row: SwarmRow) -> Self {
        Swarm {
            id: row.id,
            name: row.name,
            description: row.description,
            max_agents: row.max_agents as u32,
            created_at: row.created_at,
        }
    }
}

pub struct SqliteSwarmRepository {
    pool: SqlitePool,
}

impl SqliteSwarmRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SwarmRepository for SqliteSwarmRepository {
    async fn create(&self, swarm: &Swarm) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO swarms (id, name, description, max_agents, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&swarm.id)
        .bind(&swarm.name)
        .bind(&swarm.description)
        .bind(i64::from(swarm.max_agents))
        .bind(swarm.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<Swarm>> {
        let row = sqlx::query_as::<_, SwarmRow>("SELECT * FROM swarms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Swarm::from))
    }

    async fn get_by_name(&self, name: &str) -> FleetResult<Option<Swarm>> {
        let row = sqlx::query_as::<_, SwarmRow>("SELECT * FROM swarms WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Swarm::from))
    }

    async fn list(&self) -> FleetResult<Vec<Swarm>> {
        let rows = sqlx::query_as::<_, SwarmRow>("SELECT * FROM swarms ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Swarm::from).collect())
    }

    async fn delete(&self, id: &str) -> FleetResult<()> {
        sqlx::query("DELETE FROM swarms WHERE id = ?")
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
    async fn create_get_and_list_round_trip() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = SqliteSwarmRepository::new(db.pool().clone());

        let swarm = Swarm::new("s1".into(), "alpha".into(), 10, 0);
        repo.create(&swarm).await.unwrap();

        assert_eq!(repo.get("s1").await.unwrap().unwrap().name, "alpha");
        assert_eq!(repo.get_by_name("alpha").await.unwrap().unwrap().id, "s1");
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete("s1").await.unwrap();
        assert!(repo.get("s1").await.unwrap().is_none());
    }
}
