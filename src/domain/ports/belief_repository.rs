//! Belief repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::Belief;

#[async_trait]
pub trait BeliefRepository: Send + Sync {
    /// Insert a new belief, or overwrite the agent's existing belief about
    /// the same `(swarm_id, subject, belief_type)`.
    async fn upsert(&self, belief: &Belief) -> FleetResult<()>;

    async fn list_for_subject(&self, swarm_id: &str, subject: &str) -> FleetResult<Vec<Belief>>;

    async fn list_for_agent(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<Vec<Belief>>;
}
