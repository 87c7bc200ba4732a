//! Payoffs: declarative, per-task reward schedules that sum into one
//! payout figure at calculation time.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{calculate_payout, PayoffDefinition};
use crate::domain::ports::{Clock, PayoffRepository};

pub struct PayoffsService<P, C>
where
    P: PayoffRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<P>,
    clock: Arc<C>,
}

impl<P, C> PayoffsService<P, C>
where
    P: PayoffRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<P>, clock: Arc<C>) -> Self {
        Self { repo, clock }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn define(
        &self,
        swarm_id: String,
        task_id: String,
        payoff_type: String,
        base_amount: f64,
        multiplier: f64,
        deadline: Option<i64>,
        decay_rate: Option<f64>,
    ) -> FleetResult<PayoffDefinition> {
        let now = self.clock.now_ms();
        let definition = PayoffDefinition {
            id: Uuid::new_v4().to_string(),
            swarm_id,
            task_id,
            payoff_type,
            base_amount,
            multiplier,
            deadline,
            decay_rate,
            created_at: now,
        };
        self.repo.define(&definition).await?;
        Ok(definition)
    }

    pub async fn get(&self, id: &str) -> FleetResult<Option<PayoffDefinition>> {
        self.repo.get(id).await
    }

    pub async fn list_for_task(&self, swarm_id: &str, task_id: &str) -> FleetResult<Vec<PayoffDefinition>> {
        self.repo.list_for_task(swarm_id, task_id).await
    }

    pub async fn delete(&self, id: &str) -> FleetResult<()> {
        self.repo.get(id).await?.ok_or_else(|| FleetError::NotFound(format!("payoff definition {id}")))?;
        self.repo.delete(id).await
    }

    /// Sums every payoff definition registered for `task_id`, decaying
    /// overdue ones and subtracting `"penalty"`-typed ones. Does not apply
    /// the credit itself; the caller feeds the result into the credits
    /// ledger.
    pub async fn calculate(&self, swarm_id: &str, task_id: &str) -> FleetResult<f64> {
        let now = self.clock.now_ms();
        let definitions = self.repo.list_for_task(swarm_id, task_id).await?;
        Ok(calculate_payout(&definitions, now))
    }
}
