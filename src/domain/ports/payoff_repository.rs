//! Payoff definition repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::PayoffDefinition;

#[async_trait]
pub trait PayoffRepository: Send + Sync {
    /// Upserts on `(swarm_id, task_id, payoff_type)`.
    async fn define(&self, definition: &PayoffDefinition) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<PayoffDefinition>>;

    async fn list_for_task(&self, swarm_id: &str, task_id: &str) -> FleetResult<Vec<PayoffDefinition>>;

    async fn delete(&self, id: &str) -> FleetResult<()>;
}
