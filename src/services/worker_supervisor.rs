//! Worker supervisor — component D, the centerpiece. Owns the in-memory
//! map of live workers, drives their lifecycle, gates every mutating
//! operation by the role permission matrix, persists every transition,
//! and forwards every event to both the push hub and each worker's
//! event-stream parser.
//!
//! Grounded on the teacher's `SwarmOrchestrator<G, T, W, A, M>`: a struct
//! generic over its repository ports, holding `Arc<RwLock<...>>` runtime
//! state alongside `Arc<Repo>` persistence handles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{
    FleetStatus, Health, Role, SpawnMode, Worker, WorkerFilter, WorkerState,
};
use crate::domain::ports::{AgentLauncher, Clock, LaunchRequest, SwarmRepository, WorkerRepository};
use crate::infrastructure::parser::EventStreamParser;
use crate::services::push_hub::{Event, PushHub, Subject};

/// Tunables surfaced as environment variables per the external interface.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_depth: u32,
    pub max_fleet: u32,
    pub max_restarts: u32,
    pub dismiss_grace_ms: i64,
    pub health_tick_ms: i64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_fleet: 50,
            max_restarts: 3,
            dismiss_grace_ms: 5_000,
            health_tick_ms: 15_000,
        }
    }
}

/// Inputs to `spawn`.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub handle: String,
    pub role: Role,
    pub team_name: String,
    pub working_dir: String,
    pub initial_prompt: Option<String>,
    pub session_id: Option<String>,
    pub swarm_id: Option<String>,
    pub spawn_mode: SpawnMode,
    pub depth_level: u32,
    pub caller_role: Role,
}

/// One live worker's runtime-only state: the full `Worker` (carrying its
/// in-memory output ring, never persisted) and its event-stream parser.
struct RuntimeWorker {
    worker: Worker,
    parser: EventStreamParser,
}

fn classify_health(gap_ms: i64, error_count: u64) -> Health {
    if gap_ms < 30_000 && error_count < 5 {
        Health::Healthy
    } else if gap_ms < 120_000 && error_count < 20 {
        Health::Degraded
    } else {
        Health::Unhealthy
    }
}

/// Owns worker lifecycle. Generic over the ports it needs so tests can
/// wire in-memory fakes for `W`/`S`/`L`/`C` independently of storage.
pub struct WorkerSupervisor<W, S, L, C>
where
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
{
    workers: Arc<W>,
    swarms: Arc<S>,
    launcher: Arc<L>,
    clock: Arc<C>,
    push_hub: PushHub,
    config: SupervisorConfig,
    runtime: Arc<RwLock<HashMap<String, RuntimeWorker>>>,
    started_at_ms: i64,
}

impl<W, S, L, C> WorkerSupervisor<W, S, L, C>
where
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
{
    pub fn new(
        workers: Arc<W>,
        swarms: Arc<S>,
        launcher: Arc<L>,
        clock: Arc<C>,
        push_hub: PushHub,
        config: SupervisorConfig,
    ) -> Self {
        let started_at_ms = clock.now_ms();
        Self {
            workers,
            swarms,
            launcher,
            clock,
            push_hub,
            config,
            runtime: Arc::new(RwLock::new(HashMap::new())),
            started_at_ms,
        }
    }

    /// 1. `spawn(request) → Worker`.
    pub async fn spawn(&self, request: SpawnRequest) -> FleetResult<Worker> {
        if !request.caller_role.can_spawn() {
            return Err(FleetError::Forbidden(format!(
                "role '{}' cannot spawn workers",
                request.caller_role.as_str()
            )));
        }
        if request.depth_level > self.config.max_depth {
            return Err(FleetError::InvariantViolation(format!(
                "depth {} exceeds max_depth {}",
                request.depth_level, self.config.max_depth
            )));
        }
        if self.workers.handle_in_use(&request.handle).await? {
            return Err(FleetError::Conflict(format!("handle '{}' already in use", request.handle)));
        }
        if let Some(swarm_id) = &request.swarm_id {
            let swarm = self
                .swarms
                .get(swarm_id)
                .await?
                .ok_or_else(|| FleetError::NotFound(format!("swarm '{swarm_id}' not found")))?;
            let live = self.workers.count_live_in_swarm(swarm_id).await?;
            if swarm.is_at_capacity(live) {
                return Err(FleetError::Conflict(format!("swarm '{swarm_id}' is at capacity")));
            }
        }

        let now = self.clock.now_ms();
        let mut worker = Worker::new(
            Uuid::new_v4().to_string(),
            request.handle.clone(),
            request.team_name.clone(),
            request.role,
            request.depth_level,
            request.spawn_mode,
            now,
        );
        worker.session_id = request.session_id.clone();
        worker.swarm_id = request.swarm_id.clone();
        self.workers.create(&worker).await?;

        if request.spawn_mode == SpawnMode::Native {
            // Invariant (ii): state=ready implies sessionId != null. A native
            // worker only reaches `ready` once a session id is actually
            // latched, same as the process/tmux paths' `system/init` handling.
            if worker.session_id.is_some() {
                worker.state = WorkerState::Ready;
            }
            self.workers.update(&worker).await?;
            self.runtime.write().await.insert(
                worker.handle.clone(),
                RuntimeWorker { worker: worker.clone(), parser: EventStreamParser::new(now) },
            );
            self.push_hub
                .publish(Subject::Worker(worker.handle.clone()), Event::WorkerSpawned { handle: worker.handle.clone() })
                .await;
            return Ok(worker);
        }

        let launch_result = self
            .launcher
            .launch(LaunchRequest {
                handle: worker.handle.clone(),
                working_dir: request.working_dir.clone(),
                initial_prompt: request.initial_prompt.clone(),
                resume_session_id: request.session_id.clone(),
                spawn_mode: request.spawn_mode,
            })
            .await;

        let launched = match launch_result {
            Ok(launched) => launched,
            Err(e) => {
                worker.state = WorkerState::Stopped;
                worker.health = Health::Unhealthy;
                self.workers.update(&worker).await?;
                return Err(e);
            }
        };
        worker.pid = launched.pid;
        self.workers.update(&worker).await?;

        self.runtime.write().await.insert(
            worker.handle.clone(),
            RuntimeWorker { worker: worker.clone(), parser: EventStreamParser::new(now) },
        );

        if let Ok(output) = self.launcher.take_output_lines(&worker.handle).await {
            self.spawn_reader_task(worker.handle.clone(), output);
        }

        self.push_hub
            .publish(Subject::Worker(worker.handle.clone()), Event::WorkerSpawned { handle: worker.handle.clone() })
            .await;
        info!(handle = %worker.handle, role = worker.role.as_str(), "worker spawned");
        Ok(worker)
    }

    /// Background reader: one task per live worker, draining its output
    /// stream into the parser and reflecting state transitions into the
    /// runtime map and persistence.
    fn spawn_reader_task(&self, handle: String, mut output: tokio::sync::mpsc::Receiver<String>) {
        let runtime = self.runtime.clone();
        let workers = self.workers.clone();
        let clock = self.clock.clone();
        let push_hub = self.push_hub.clone();

        tokio::spawn(async move {
            while let Some(line) = output.recv().await {
                let now = clock.now_ms();
                let mut map = runtime.write().await;
                let Some(entry) = map.get_mut(&handle) else { break };
                entry.worker.push_output_line(line.clone());
                if let Some(parsed) = entry.parser.parse_line(&line, now) {
                    use crate::domain::models::ParsedEvent;
                    match parsed {
                        ParsedEvent::SystemInit { session_id } => {
                            entry.worker.session_id = Some(session_id);
                            entry.worker.state = WorkerState::Ready;
                        }
                        ParsedEvent::Assistant { .. } => {
                            entry.worker.state = WorkerState::Working;
                        }
                        ParsedEvent::Result { is_error } => {
                            if !is_error {
                                entry.worker.state = WorkerState::Stopped;
                            }
                        }
                        ParsedEvent::Other { .. } => {}
                    }
                }
                let snapshot = entry.worker.clone();
                drop(map);
                let _ = workers.update(&snapshot).await;
                push_hub
                    .publish(Subject::Worker(handle.clone()), Event::WorkerOutput { handle: handle.clone(), line })
                    .await;

                if snapshot.state == WorkerState::Stopped {
                    push_hub
                        .publish(Subject::Worker(handle.clone()), Event::WorkerExit { handle: handle.clone(), code: Some(0) })
                        .await;
                }
            }
        });
    }

    /// 2. `dismiss(handle) → bool`. Idempotent on an already-terminal worker.
    pub async fn dismiss(&self, handle: &str, caller_role: Role) -> FleetResult<bool> {
        if !caller_role.can_dismiss() {
            return Err(FleetError::Forbidden(format!("role '{}' cannot dismiss workers", caller_role.as_str())));
        }

        let mut worker = {
            let map = self.runtime.read().await;
            match map.get(handle) {
                Some(entry) if !entry.worker.state.is_terminal() => entry.worker.clone(),
                _ => return Ok(false),
            }
        };

        worker.state = WorkerState::Stopping;
        self.workers.update(&worker).await?;
        self.launcher.signal_stop(handle).await?;

        tokio::time::sleep(std::time::Duration::from_millis(self.config.dismiss_grace_ms as u64)).await;
        if self.launcher.is_alive(handle).await.unwrap_or(false) {
            self.launcher.force_kill(handle).await?;
        }

        worker.state = WorkerState::Dismissed;
        worker.dismissed_at = Some(self.clock.now_ms());
        self.workers.update(&worker).await?;
        self.runtime.write().await.remove(handle);

        self.push_hub
            .publish(Subject::Worker(handle.to_string()), Event::WorkerDismissed { handle: handle.to_string() })
            .await;
        Ok(true)
    }

    /// 3. `broadcast(message, fromHandle?)` — non-persistent multicast to
    /// all live workers' input streams.
    pub async fn broadcast(&self, message: &str, caller_role: Role) -> FleetResult<usize> {
        if !caller_role.can_broadcast() {
            return Err(FleetError::Forbidden(format!("role '{}' cannot broadcast", caller_role.as_str())));
        }
        let handles: Vec<String> = self.runtime.read().await.keys().cloned().collect();
        let mut delivered = 0;
        for handle in handles {
            if self.launcher.send_input(&handle, message).await.is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// 4. `heartbeat(handle, now)`. Silent if the worker is not found.
    pub async fn heartbeat(&self, handle: &str, now: i64) -> FleetResult<()> {
        let mut map = self.runtime.write().await;
        let Some(entry) = map.get_mut(handle) else { return Ok(()) };
        entry.worker.last_heartbeat = now;
        let snapshot = entry.worker.clone();
        drop(map);
        self.workers.update(&snapshot).await
    }

    /// 5. `listWorkers` ordered by `spawnedAt` ascending (delegated to the
    /// repository, which owns that ordering).
    pub async fn list_workers(&self, filter: WorkerFilter) -> FleetResult<Vec<Worker>> {
        self.workers.list(filter).await
    }

    pub async fn get_worker(&self, handle: &str) -> FleetResult<Option<Worker>> {
        if let Some(entry) = self.runtime.read().await.get(handle) {
            return Ok(Some(entry.worker.clone()));
        }
        self.workers.get_by_handle(handle).await
    }

    /// 6. `getStatus()` — aggregate counts plus restart and uptime stats.
    pub async fn get_status(&self) -> FleetResult<FleetStatus> {
        let all = self.workers.list(WorkerFilter::default()).await?;
        let mut status = FleetStatus { total: all.len(), ..Default::default() };
        for w in &all {
            *status.by_state.entry(w.state.as_str().to_string()).or_insert(0) += 1;
            *status.by_role.entry(w.role.as_str().to_string()).or_insert(0) += 1;
            *status.by_health.entry(w.health.as_str().to_string()).or_insert(0) += 1;
        }
        let now = self.clock.now_ms();
        status.restarts_total = self.workers.count_restarts_since(0).await?;
        status.restarts_last_hour = self.workers.count_restarts_since(now - 3_600_000).await?;
        status.uptime_ms = now - self.started_at_ms;
        Ok(status)
    }

    /// Periodic health tick: classifies every live worker's health from its
    /// heartbeat gap and parser error count, and auto-restarts workers that
    /// have gone unhealthy while still under their restart quota.
    pub async fn health_tick(&self) -> FleetResult<()> {
        let now = self.clock.now_ms();
        let handles: Vec<String> = self.runtime.read().await.keys().cloned().collect();

        for handle in handles {
            let (gap_ms, error_count, mut worker) = {
                let map = self.runtime.read().await;
                let Some(entry) = map.get(&handle) else { continue };
                let gap = now - entry.worker.last_heartbeat;
                let signal = entry.parser.get_health_signal(now);
                (gap, signal.error_count, entry.worker.clone())
            };

            let health = classify_health(gap_ms, error_count);
            worker.health = health;

            let should_restart = health == Health::Unhealthy
                && worker.spawn_mode.is_restart_managed()
                && worker.role.is_restartable()
                && worker.restart_count < self.config.max_restarts;

            if should_restart {
                let _ = self.launcher.force_kill(&handle).await;
                let launch = self
                    .launcher
                    .launch(LaunchRequest {
                        handle: handle.clone(),
                        working_dir: String::new(),
                        initial_prompt: None,
                        resume_session_id: worker.session_id.clone(),
                        spawn_mode: worker.spawn_mode,
                    })
                    .await;
                match launch {
                    Ok(launched) => {
                        worker.pid = launched.pid;
                        worker.restart_count += 1;
                        worker.health = Health::Healthy;
                        worker.last_heartbeat = now;
                        if let Ok(output) = self.launcher.take_output_lines(&handle).await {
                            self.spawn_reader_task(handle.clone(), output);
                        }
                        self.push_hub
                            .publish(Subject::Worker(handle.clone()), Event::WorkerRestarted { handle: handle.clone() })
                            .await;
                    }
                    Err(e) => {
                        warn!(handle, error = %e, "auto-restart failed");
                    }
                }
            }

            self.workers.update(&worker).await?;
            if let Some(entry) = self.runtime.write().await.get_mut(&handle) {
                entry.worker = worker;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_classification_thresholds() {
        assert_eq!(classify_health(0, 0), Health::Healthy);
        assert_eq!(classify_health(29_999, 4), Health::Healthy);
        assert_eq!(classify_health(30_000, 0), Health::Degraded);
        assert_eq!(classify_health(0, 5), Health::Degraded);
        assert_eq!(classify_health(120_000, 0), Health::Unhealthy);
        assert_eq!(classify_health(0, 20), Health::Unhealthy);
    }
}
