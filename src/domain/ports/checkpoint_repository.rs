//! Checkpoint repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::Checkpoint;

#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn create(&self, checkpoint: &Checkpoint) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<Checkpoint>>;

    async fn update(&self, checkpoint: &Checkpoint) -> FleetResult<()>;

    /// Checkpoints addressed to `handle`, ordered by `created_at` ascending.
    async fn list_for_handle(&self, handle: &str) -> FleetResult<Vec<Checkpoint>>;
}
