//! Swarm repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::Swarm;

#[async_trait]
pub trait SwarmRepository: Send + Sync {
    async fn create(&self, swarm: &Swarm) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<Swarm>>;

    async fn get_by_name(&self, name: &str) -> FleetResult<Option<Swarm>>;

    async fn list(&self) -> FleetResult<Vec<Swarm>>;

    async fn delete(&self, id: &str) -> FleetResult<()>;
}
