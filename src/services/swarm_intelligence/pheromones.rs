//! Pheromone trails: stigmergic coordination markers deposited on shared
//! resources, decaying over time.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::FleetResult;
use crate::domain::models::{DecayResult, PheromoneFilter, PheromoneTrail, ResourceActivity};
use crate::domain::ports::{Clock, PheromoneRepository};
use crate::services::push_hub::{Event, PushHub, Subject};

pub struct PheromoneService<P, C>
where
    P: PheromoneRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<P>,
    clock: Arc<C>,
    push_hub: PushHub,
}

impl<P, C> PheromoneService<P, C>
where
    P: PheromoneRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<P>, clock: Arc<C>, push_hub: PushHub) -> Self {
        Self { repo, clock, push_hub }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn deposit(
        &self,
        swarm_id: String,
        depositor_handle: String,
        resource_id: String,
        resource_type: String,
        trail_type: String,
        intensity: f64,
    ) -> FleetResult<PheromoneTrail> {
        let now = self.clock.now_ms();
        let trail = PheromoneTrail::new(
            Uuid::new_v4().to_string(),
            swarm_id.clone(),
            depositor_handle,
            resource_id.clone(),
            resource_type,
            trail_type,
            intensity,
            now,
        );
        self.repo.deposit(&trail).await?;
        self.push_hub
            .publish(Subject::Swarm(swarm_id.clone()), Event::PheromoneDeposit { swarm_id, resource: resource_id })
            .await;
        Ok(trail)
    }

    pub async fn query(&self, filter: PheromoneFilter) -> FleetResult<Vec<PheromoneTrail>> {
        self.repo.query(filter).await
    }

    pub async fn get_resource_trails(&self, swarm_id: &str, resource_id: &str) -> FleetResult<Vec<PheromoneTrail>> {
        self.repo
            .query(PheromoneFilter {
                swarm_id: Some(swarm_id.to_string()),
                resource_id: Some(resource_id.to_string()),
                ..Default::default()
            })
            .await
    }

    pub async fn get_activity(&self, swarm_id: &str, limit: usize) -> FleetResult<Vec<ResourceActivity>> {
        self.repo.get_activity(swarm_id, limit).await
    }

    /// Multiply every stored trail's intensity by `(1 - rate)` and delete
    /// any that fall below `min_intensity`.
    pub async fn process_decay(&self, rate: f64, min_intensity: f64) -> FleetResult<DecayResult> {
        let (decayed, removed) = self.repo.decay_all(rate, min_intensity).await?;
        Ok(DecayResult { decayed, removed })
    }
}
