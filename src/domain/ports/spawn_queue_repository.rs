//! Spawn queue repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{SpawnQueueFilter, SpawnQueueItem};

#[async_trait]
pub trait SpawnQueueRepository: Send + Sync {
    async fn enqueue(&self, item: &SpawnQueueItem) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<SpawnQueueItem>>;

    async fn update(&self, item: &SpawnQueueItem) -> FleetResult<()>;

    async fn list(&self, filter: SpawnQueueFilter) -> FleetResult<Vec<SpawnQueueItem>>;

    /// Items ready to schedule (`pending`, `blocked_by_count = 0`), ordered
    /// by `(priority desc, created_at asc)`.
    async fn list_ready(&self, limit: usize) -> FleetResult<Vec<SpawnQueueItem>>;

    /// Decrement `blocked_by_count` on every item depending on `completed_id`.
    async fn release_dependents(&self, completed_id: &str) -> FleetResult<u64>;
}
