//! Worker repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{Worker, WorkerFilter};

/// Persistence interface for [`Worker`] aggregates. `recent_output` is never
/// passed through this port: it lives only in the in-memory supervisor map.
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    async fn create(&self, worker: &Worker) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<Worker>>;

    async fn get_by_handle(&self, handle: &str) -> FleetResult<Option<Worker>>;

    async fn update(&self, worker: &Worker) -> FleetResult<()>;

    /// List workers ordered by `spawned_at` ascending.
    async fn list(&self, filter: WorkerFilter) -> FleetResult<Vec<Worker>>;

    /// `true` if a non-dismissed worker already holds this handle.
    async fn handle_in_use(&self, handle: &str) -> FleetResult<bool>;

    /// Count currently-live (non-terminal) workers in a swarm.
    async fn count_live_in_swarm(&self, swarm_id: &str) -> FleetResult<u32>;

    /// Count restarts recorded across all workers in the trailing window.
    async fn count_restarts_since(&self, since_ms: i64) -> FleetResult<u64>;
}
