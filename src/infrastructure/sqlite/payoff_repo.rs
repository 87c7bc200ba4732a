//! `SQLite` implementation of [`PayoffRepository`].

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::FleetResult;
use crate::domain::models::PayoffDefinition;
use crate::domain::ports::PayoffRepository;

#[derive(FromRow)]
struct PayoffRow {
    id: String,
    swarm_id: String,
    task_id: String,
    payoff_type: String,
    base_amount: f64,
    multiplier: f64,
    deadline: Option<i64>,
    decay_rate: Option<f64>,
    created_at: i64,
}

impl From<PayoffRow> for PayoffDefinition {
    fn from(row: PayoffRow) -> Self {
        PayoffDefinition {
            id: row.id,
            swarm_id: row.swarm_id,
            task_id: row.task_id,
            payoff_type: row.payoff_type,
            base_amount: row.base_amount,
            multiplier: row.multiplier,
            deadline: row.deadline,
            decay_rate: row.decay_rate,
            created_at: row.created_at,
        }
    }
}

pub struct SqlitePayoffRepository {
    pool: SqlitePool,
}

impl SqlitePayoffRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayoffRepository for SqlitePayoffRepository {
    async fn define(&self, definition: &PayoffDefinition) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO payoff_definitions
                (id, swarm_id, task_id, payoff_type, base_amount, multiplier, deadline, decay_rate, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (swarm_id, task_id, payoff_type)
             DO UPDATE SET base_amount = excluded.base_amount,
                multiplier = excluded.multiplier,
                deadline = excluded.deadline,
                decay_rate = excluded.decay_rate",
        )
        .bind(&definition.id)
        .bind(&definition.swarm_id)
        .bind(&definition.task_id)
        .bind(&definition.payoff_type)
        .bind(definition.base_amount)
        .bind(definition.multiplier)
        .bind(definition.deadline)
        .bind(definition.decay_rate)
        .bind(definition.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> FleetResult<Option<PayoffDefinition>> {
        let row = sqlx::query_as::<_, PayoffRow>("SELECT * FROM payoff_definitions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PayoffDefinition::from))
    }

    async fn list_for_task(&self, swarm_id: &str, task_id: &str) -> FleetResult<Vec<PayoffDefinition>> {
        let rows = sqlx::query_as::<_, PayoffRow>(
            "SELECT * FROM payoff_definitions WHERE swarm_id = ? AND task_id = ? ORDER BY created_at ASC",
        )
        .bind(swarm_id)
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PayoffDefinition::from).collect())
    }

    async fn delete(&self, id: &str) -> FleetResult<()> {
        sqlx::query("DELETE FROM payoff_definitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
