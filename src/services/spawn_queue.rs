//! Spawn queue & admission control — component E. Accepts spawn requests
//! from existing workers (so a coordinator or architect may grow the
//! fleet) and hands ready items to the worker supervisor on a timer.
//!
//! Grounded on the teacher's `domain/models/queue.rs` `TaskQueue<T>`
//! (priority-ordered admission) and `services/dag_executor.rs` (dependency
//! release on completion), adapted from task execution to worker spawn
//! admission.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{Role, SpawnPayload, SpawnQueueFilter, SpawnQueueItem, SpawnStatus, WorkerFilter};
use crate::domain::ports::{AgentLauncher, Clock, SpawnQueueRepository, SwarmRepository, WorkerRepository};
use crate::services::push_hub::{Event, PushHub, Subject};
use crate::services::worker_supervisor::{SpawnRequest, WorkerSupervisor};

#[derive(Debug, Clone)]
pub struct SpawnQueueConfig {
    pub max_depth: u32,
    pub max_fleet: u32,
    pub fanout_per_tick: usize,
}

impl Default for SpawnQueueConfig {
    fn default() -> Self {
        Self { max_depth: 3, max_fleet: 50, fanout_per_tick: 5 }
    }
}

pub struct SpawnQueueService<Q, W, S, L, C>
where
    Q: SpawnQueueRepository + 'static,
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
{
    queue: Arc<Q>,
    workers: Arc<W>,
    supervisor: Arc<WorkerSupervisor<W, S, L, C>>,
    clock: Arc<C>,
    push_hub: PushHub,
    config: SpawnQueueConfig,
}

impl<Q, W, S, L, C> SpawnQueueService<Q, W, S, L, C>
where
    Q: SpawnQueueRepository + 'static,
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        workers: Arc<W>,
        supervisor: Arc<WorkerSupervisor<W, S, L, C>>,
        clock: Arc<C>,
        push_hub: PushHub,
        config: SpawnQueueConfig,
    ) -> Self {
        Self { queue, workers, supervisor, clock, push_hub, config }
    }

    /// Enqueue a spawn request. Depth and role admission rules are checked
    /// here; capacity and dependency readiness are evaluated by the
    /// scheduler tick, since they can change after enqueue.
    pub async fn enqueue(
        &self,
        requester_handle: String,
        requester_role: Role,
        requester_depth: u32,
        target_agent_type: String,
        priority: crate::domain::models::Priority,
        depends_on: Vec<String>,
        payload: SpawnPayload,
    ) -> FleetResult<SpawnQueueItem> {
        let depth_level = requester_depth + 1;
        if depth_level > self.config.max_depth {
            return Err(FleetError::InvariantViolation(format!(
                "depth {depth_level} exceeds max_depth {}",
                self.config.max_depth
            )));
        }
        if !requester_role.can_spawn() {
            return Err(FleetError::Forbidden(format!(
                "role '{}' cannot enqueue spawn requests",
                requester_role.as_str()
            )));
        }

        let now = self.clock.now_ms();
        let item = SpawnQueueItem::new(
            Uuid::new_v4().to_string(),
            requester_handle,
            target_agent_type,
            depth_level,
            priority,
            depends_on,
            payload,
            now,
        );
        self.queue.enqueue(&item).await?;
        self.push_hub.publish(Subject::All, Event::SpawnQueued { item_id: item.id.clone() }).await;
        Ok(item)
    }

    async fn live_worker_count(&self) -> FleetResult<u32> {
        let all = self.workers.list(WorkerFilter::default()).await?;
        Ok(all
            .iter()
            .filter(|w| !matches!(w.state, crate::domain::models::WorkerState::Dismissed))
            .count() as u32)
    }

    /// One scheduler tick: select ready items in `(priority desc, created_at
    /// asc)` order, bounded to `fanout_per_tick`, and hand each to the
    /// supervisor in order. Items that would exceed `MAX_FLEET` are left
    /// pending ("held") rather than rejected.
    pub async fn tick(&self) -> FleetResult<()> {
        let ready = self.queue.list_ready(self.config.fanout_per_tick).await?;
        let mut approved_count = self
            .queue
            .list(SpawnQueueFilter { status: Some(SpawnStatus::Approved), requester_handle: None })
            .await?
            .len() as u32;
        let mut live_count = self.live_worker_count().await?;

        for mut item in ready {
            if live_count + approved_count >= self.config.max_fleet {
                break;
            }

            let requester = self.workers.get_by_handle(&item.requester_handle).await?;
            let Some(requester) = requester else {
                item.status = SpawnStatus::Rejected;
                item.processed_at = Some(self.clock.now_ms());
                self.queue.update(&item).await?;
                self.push_hub
                    .publish(Subject::All, Event::SpawnRejected { item_id: item.id.clone(), reason: "requester not found".into() })
                    .await;
                continue;
            };

            let Some(role) = Role::from_str(&item.target_agent_type) else {
                item.status = SpawnStatus::Rejected;
                item.processed_at = Some(self.clock.now_ms());
                self.queue.update(&item).await?;
                self.push_hub
                    .publish(Subject::All, Event::SpawnRejected { item_id: item.id.clone(), reason: "unknown target_agent_type".into() })
                    .await;
                continue;
            };

            item.status = SpawnStatus::Approved;
            self.queue.update(&item).await?;
            approved_count += 1;
            self.push_hub.publish(Subject::All, Event::SpawnApproved { item_id: item.id.clone() }).await;

            let spawn_result = self
                .supervisor
                .spawn(SpawnRequest {
                    handle: format!("{}-{}", item.target_agent_type, &item.id[..8]),
                    role,
                    team_name: requester.team_name.clone(),
                    working_dir: requester
                        .worktree_path
                        .clone()
                        .unwrap_or_else(|| ".".to_string()),
                    initial_prompt: Some(item.payload.task.clone()),
                    session_id: None,
                    swarm_id: requester.swarm_id.clone(),
                    spawn_mode: crate::domain::models::SpawnMode::Process,
                    depth_level: item.depth_level,
                    caller_role: requester.role,
                })
                .await;

            match spawn_result {
                Ok(worker) => {
                    item.status = SpawnStatus::Spawned;
                    item.spawned_worker_id = Some(worker.id.clone());
                    item.processed_at = Some(self.clock.now_ms());
                    self.queue.update(&item).await?;
                    live_count += 1;
                    self.queue.release_dependents(&item.id).await?;
                    self.push_hub
                        .publish(Subject::All, Event::SpawnSpawned { item_id: item.id.clone(), handle: worker.handle.clone() })
                        .await;
                }
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "spawn admission failed");
                    item.status = SpawnStatus::Rejected;
                    item.processed_at = Some(self.clock.now_ms());
                    self.queue.update(&item).await?;
                    approved_count = approved_count.saturating_sub(1);
                    self.push_hub
                        .publish(Subject::All, Event::SpawnRejected { item_id: item.id.clone(), reason: e.to_string() })
                        .await;
                }
            }
        }
        Ok(())
    }
}
