//! Pheromone repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{PheromoneFilter, PheromoneTrail, ResourceActivity};

#[async_trait]
pub trait PheromoneRepository: Send + Sync {
    async fn deposit(&self, trail: &PheromoneTrail) -> FleetResult<()>;

    async fn query(&self, filter: PheromoneFilter) -> FleetResult<Vec<PheromoneTrail>>;

    /// Apply `rate` decay to every stored trail, delete any trail that ends
    /// up below `min_intensity`. Returns `(decayed, removed)` counts.
    async fn decay_all(&self, rate: f64, min_intensity: f64) -> FleetResult<(usize, usize)>;

    /// Top resources by aggregate intensity within a swarm.
    async fn get_activity(&self, swarm_id: &str, limit: usize) -> FleetResult<Vec<ResourceActivity>>;
}
