//! `SQLite` implementation of [`BeliefRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::Belief;
use crate::domain::ports::BeliefRepository;

#[derive(FromRow)]
struct BeliefRow {
    id: String,
    swarm_id: String,
    agent_handle: String,
    subject: String,
    belief_type: String,
    value: String,
    confidence: f64,
    evidence: String,
    updated_at: i64,
}

impl TryFrom<BeliefRow> for Belief {
    type Error = crate::domain::errors::FleetError;

    fn try_from(row: BeliefRow) -> Result<Self, Self::Error> {
        Ok(Belief {
            id: row.id,
            swarm_id: row.swarm_id,
            agent_handle: row.agent_handle,
            subject: row.subject,
            belief_type: row.belief_type,
            value: serde_json::from_str(&row.value)?,
            confidence: row.confidence,
            evidence: serde_json::from_str(&row.evidence)?,
            updated_at: row.updated_at,
        })
    }
}

pub struct SqliteBeliefRepository {
    pool: SqlitePool,
}

impl SqliteBeliefRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BeliefRepository for SqliteBeliefRepository {
    async fn upsert(&self, belief: &Belief) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO beliefs
                (id, swarm_id, agent_handle, subject, belief_type, value, confidence, evidence, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (swarm_id, agent_handle, subject, belief_type)
             DO UPDATE SET value = excluded.value, confidence = excluded.confidence,
                evidence = excluded.evidence, updated_at = excluded.updated_at",
        )
        .bind(&belief.id)
        .bind(&belief.swarm_id)
        .bind(&belief.agent_handle)
        .bind(&belief.subject)
        .bind(&belief.belief_type)
        .bind(serde_json::to_string(&belief.value)?)
        .bind(belief.confidence)
        .bind(serde_json::to_string(&belief.evidence)?)
        .bind(belief.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_subject(&self, swarm_id: &str, subject: &str) -> FleetResult<Vec<Belief>> {
        let rows = sqlx::query_as::<_, BeliefRow>(
            "SELECT * FROM beliefs WHERE swarm_id = ? AND subject = ? ORDER BY updated_at ASC",
        )
        .bind(swarm_id)
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Belief::try_from).collect()
    }

    async fn list_for_agent(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<Vec<Belief>> {
        let rows = sqlx::query_as::<_, BeliefRow>(
            "SELECT * FROM beliefs WHERE swarm_id = ? AND agent_handle = ? ORDER BY updated_at ASC",
        )
        .bind(swarm_id)
        .bind(agent_handle)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Belief::try_from).collect()
    }
}
