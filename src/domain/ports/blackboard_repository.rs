//! Blackboard repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{BlackboardFilter, BlackboardMessage};

#[async_trait]
pub trait BlackboardRepository: Send + Sync {
    async fn post(&self, message: &BlackboardMessage) -> FleetResult<()>;

    async fn get(&self, id: &str) -> FleetResult<Option<BlackboardMessage>>;

    async fn update(&self, message: &BlackboardMessage) -> FleetResult<()>;

    /// List messages ordered by `created_at` ascending.
    async fn list(&self, filter: BlackboardFilter) -> FleetResult<Vec<BlackboardMessage>>;

    async fn archive(&self, id: &str, archived_at: i64) -> FleetResult<()>;
}
