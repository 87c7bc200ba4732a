//! Blackboard and checkpoint coordination — the message-passing half of
//! component B's contract that the kernel exposes as operations rather
//! than bare repository CRUD, so the monotonic-read-set and archival
//! invariants from spec §3 live in one place instead of at every caller.
//!
//! Neither blackboard messages nor checkpoints have a dedicated push-event
//! shape in the external interface (§7 lists `worker:*`, `swarm:*`,
//! `spawn:*`, the swarm-intelligence events, and `compound:*`, and stops
//! there), so these services persist without publishing.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{
    BlackboardFilter, BlackboardMessage, Checkpoint, CheckpointBody, MessageType, Priority,
};
use crate::domain::ports::{BlackboardRepository, Clock, CheckpointRepository};

/// Thin wrapper over [`BlackboardRepository`] enforcing the monotonic
/// read-set and archived-exclusion invariants from spec §3.
pub struct BlackboardService<B, C>
where
    B: BlackboardRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<B>,
    clock: Arc<C>,
}

impl<B, C> BlackboardService<B, C>
where
    B: BlackboardRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<B>, clock: Arc<C>) -> Self {
        Self { repo, clock }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn post(
        &self,
        swarm_id: String,
        sender_handle: String,
        message_type: MessageType,
        target_handle: Option<String>,
        priority: Priority,
        payload: serde_json::Value,
    ) -> FleetResult<BlackboardMessage> {
        let now = self.clock.now_ms();
        let message = BlackboardMessage::new(
            Uuid::new_v4().to_string(),
            swarm_id,
            sender_handle,
            message_type,
            target_handle,
            priority,
            payload,
            now,
        );
        self.repo.post(&message).await?;
        Ok(message)
    }

    /// Marks `handle` as having read `id`. A no-op on an already-read
    /// handle since the read set is a set, not a counter.
    pub async fn mark_read(&self, id: &str, handle: &str) -> FleetResult<BlackboardMessage> {
        let mut message = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("blackboard message '{id}' not found")))?;
        message.mark_read(handle);
        self.repo.update(&message).await?;
        Ok(message)
    }

    pub async fn archive(&self, id: &str) -> FleetResult<()> {
        let now = self.clock.now_ms();
        self.repo.archive(id, now).await
    }

    /// Excludes archived messages unless `filter.include_archived` is set.
    pub async fn list(&self, filter: BlackboardFilter) -> FleetResult<Vec<BlackboardMessage>> {
        self.repo.list(filter).await
    }
}

/// Thin wrapper over [`CheckpointRepository`] driving the
/// `pending → {accepted, rejected}` handoff state machine.
pub struct CheckpointService<K, C>
where
    K: CheckpointRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<K>,
    clock: Arc<C>,
}

impl<K, C> CheckpointService<K, C>
where
    K: CheckpointRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<K>, clock: Arc<C>) -> Self {
        Self { repo, clock }
    }

    pub async fn submit(&self, from_handle: String, to_handle: String, body: CheckpointBody) -> FleetResult<Checkpoint> {
        let now = self.clock.now_ms();
        let checkpoint = Checkpoint::new(Uuid::new_v4().to_string(), from_handle, to_handle, body, now);
        self.repo.create(&checkpoint).await?;
        Ok(checkpoint)
    }

    async fn transition(&self, id: &str, status: crate::domain::models::CheckpointStatus) -> FleetResult<Checkpoint> {
        let mut checkpoint = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("checkpoint '{id}' not found")))?;
        if checkpoint.status != crate::domain::models::CheckpointStatus::Pending {
            return Err(FleetError::InvariantViolation(format!(
                "checkpoint '{id}' is already {}",
                checkpoint.status.as_str()
            )));
        }
        checkpoint.status = status;
        self.repo.update(&checkpoint).await?;
        Ok(checkpoint)
    }

    pub async fn accept(&self, id: &str) -> FleetResult<Checkpoint> {
        self.transition(id, crate::domain::models::CheckpointStatus::Accepted).await
    }

    pub async fn reject(&self, id: &str) -> FleetResult<Checkpoint> {
        self.transition(id, crate::domain::models::CheckpointStatus::Rejected).await
    }

    pub async fn list_for_handle(&self, handle: &str) -> FleetResult<Vec<Checkpoint>> {
        self.repo.list_for_handle(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CheckpointStatus;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct FakeClock;
    impl Clock for FakeClock {
        fn now_ms(&self) -> i64 {
            1_000
        }
    }

    #[derive(Default)]
    struct FakeCheckpointRepo {
        rows: Mutex<HashMap<String, Checkpoint>>,
    }

    #[async_trait::async_trait]
    impl CheckpointRepository for FakeCheckpointRepo {
        async fn create(&self, checkpoint: &Checkpoint) -> FleetResult<()> {
            self.rows.lock().await.insert(checkpoint.id.clone(), checkpoint.clone());
            Ok(())
        }
        async fn get(&self, id: &str) -> FleetResult<Option<Checkpoint>> {
            Ok(self.rows.lock().await.get(id).cloned())
        }
        async fn update(&self, checkpoint: &Checkpoint) -> FleetResult<()> {
            self.rows.lock().await.insert(checkpoint.id.clone(), checkpoint.clone());
            Ok(())
        }
        async fn list_for_handle(&self, handle: &str) -> FleetResult<Vec<Checkpoint>> {
            Ok(self.rows.lock().await.values().filter(|c| c.to_handle == handle).cloned().collect())
        }
    }

    #[tokio::test]
    async fn accepting_twice_is_rejected_as_invariant_violation() {
        let service = CheckpointService::new(Arc::new(FakeCheckpointRepo::default()), Arc::new(FakeClock));
        let checkpoint = service
            .submit("alpha".into(), "beta".into(), CheckpointBody::default())
            .await
            .unwrap();
        let accepted = service.accept(&checkpoint.id).await.unwrap();
        assert_eq!(accepted.status, CheckpointStatus::Accepted);
        let err = service.accept(&checkpoint.id).await.unwrap_err();
        assert!(matches!(err, FleetError::InvariantViolation(_)));
    }
}
