//! Fleetd — a fleet orchestration kernel: worker lifecycle supervision,
//! spawn admission control, a compound gate-validation loop, and
//! swarm-intelligence services over a pluggable storage and
//! push-notification layer.

pub mod domain;
pub mod infrastructure;
pub mod services;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use domain::ports::Clock;
use infrastructure::clock::SystemClock;
use infrastructure::config::Config;
use infrastructure::git::CliGitInvoker;
use infrastructure::process::AgentProcessLauncher;
use infrastructure::sqlite::{
    SqliteBeliefRepository, SqliteBiddingRepository, SqliteBlackboardRepository,
    SqliteCheckpointRepository, SqliteConsensusRepository, SqliteCreditRepository,
    SqlitePayoffRepository, SqlitePheromoneRepository, SqliteSpawnQueueRepository,
    SqliteSwarmRepository, SqliteWorkerRepository,
};
use services::compound_driver::{CompoundDriver, CompoundDriverConfig};
use services::coordination::{BlackboardService, CheckpointService};
use services::push_hub::PushHub;
use services::spawn_queue::{SpawnQueueConfig, SpawnQueueService};
use services::swarm_intelligence::{
    BeliefService, BiddingService, ConsensusService, CreditsService, PayoffsService,
    PheromoneService,
};
use services::worker_supervisor::{SupervisorConfig, WorkerSupervisor};

/// Concrete port instantiations the kernel wires in production. Every
/// service above `FleetKernel` stays generic over its ports; this is the
/// one place that picks `SQLite` + the real git/process/clock adapters.
type Workers = SqliteWorkerRepository;
type Swarms = SqliteSwarmRepository;
type Launcher = AgentProcessLauncher;
type ClockImpl = SystemClock;
type Git = CliGitInvoker;

/// Handle returned by [`FleetKernel::spawn_background_tasks`]. Dropping it
/// does not stop the tasks; call [`BackgroundTasks::shutdown`] explicitly.
pub struct BackgroundTasks {
    stop_flag: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Signals every background task to stop at its next poll and waits
    /// for them to exit.
    pub async fn shutdown(self) {
        self.stop_flag.store(true, Ordering::Release);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked during shutdown");
            }
        }
    }
}

/// Composition root: owns every repository, port adapter, and service, and
/// spawns the kernel's background tasks (reader tasks are spawned
/// per-worker by the supervisor itself; this owns the fleet-wide ones).
pub struct FleetKernel {
    pub supervisor: Arc<WorkerSupervisor<Workers, Swarms, Launcher, ClockImpl>>,
    pub spawn_queue: Arc<SpawnQueueService<SqliteSpawnQueueRepository, Workers, Swarms, Launcher, ClockImpl>>,
    pub compound_driver: Arc<CompoundDriver<Workers, Swarms, Launcher, ClockImpl, Git>>,
    pub beliefs: Arc<BeliefService<SqliteBeliefRepository, ClockImpl>>,
    pub bidding: Arc<BiddingService<SqliteBiddingRepository, ClockImpl>>,
    pub consensus: Arc<ConsensusService<SqliteConsensusRepository, ClockImpl>>,
    pub credits: Arc<CreditsService<SqliteCreditRepository, ClockImpl>>,
    pub payoffs: Arc<PayoffsService<SqlitePayoffRepository, ClockImpl>>,
    pub pheromones: Arc<PheromoneService<SqlitePheromoneRepository, ClockImpl>>,
    pub blackboard: Arc<BlackboardService<SqliteBlackboardRepository, ClockImpl>>,
    pub checkpoints: Arc<CheckpointService<SqliteCheckpointRepository, ClockImpl>>,
    pub push_hub: PushHub,
    clock: Arc<ClockImpl>,
}

impl FleetKernel {
    /// Wires every adapter against one connection pool and a shared
    /// [`PushHub`]. Does not run migrations or spawn background tasks; the
    /// binary front-ends decide when those happen.
    pub fn new(pool: sqlx::SqlitePool, config: &Config) -> Self {
        let push_hub = PushHub::new(config.push_hub.queue_capacity);
        let clock = Arc::new(SystemClock);

        let workers = Arc::new(SqliteWorkerRepository::new(pool.clone()));
        let swarms = Arc::new(SqliteSwarmRepository::new(pool.clone()));
        let launcher = Arc::new(AgentProcessLauncher::new("claude"));
        let git = Arc::new(CliGitInvoker::new());

        let supervisor_config = SupervisorConfig {
            max_depth: config.limits.max_depth,
            max_fleet: config.limits.max_fleet,
            max_restarts: config.limits.max_restarts,
            dismiss_grace_ms: config.limits.dismiss_grace_ms as i64,
            health_tick_ms: config.limits.health_tick_ms as i64,
        };
        let supervisor = Arc::new(WorkerSupervisor::new(
            workers.clone(),
            swarms.clone(),
            launcher.clone(),
            clock.clone(),
            push_hub.clone(),
            supervisor_config,
        ));

        let spawn_queue_repo = Arc::new(SqliteSpawnQueueRepository::new(pool.clone()));
        let spawn_queue_config = SpawnQueueConfig { max_depth: config.limits.max_depth, max_fleet: config.limits.max_fleet, ..Default::default() };
        let spawn_queue = Arc::new(SpawnQueueService::new(
            spawn_queue_repo,
            workers.clone(),
            supervisor.clone(),
            clock.clone(),
            push_hub.clone(),
            spawn_queue_config,
        ));

        let compound_driver = Arc::new(CompoundDriver::new(
            supervisor.clone(),
            swarms.clone(),
            clock.clone(),
            git,
            push_hub.clone(),
            CompoundDriverConfig::default(),
        ));

        let beliefs = Arc::new(BeliefService::new(Arc::new(SqliteBeliefRepository::new(pool.clone())), clock.clone(), push_hub.clone()));
        let bidding = Arc::new(BiddingService::new(Arc::new(SqliteBiddingRepository::new(pool.clone())), clock.clone(), push_hub.clone()));
        let consensus = Arc::new(ConsensusService::new(Arc::new(SqliteConsensusRepository::new(pool.clone())), clock.clone(), push_hub.clone()));
        let credits = Arc::new(CreditsService::new(Arc::new(SqliteCreditRepository::new(pool.clone())), clock.clone(), push_hub.clone()));
        let payoffs = Arc::new(PayoffsService::new(Arc::new(SqlitePayoffRepository::new(pool.clone())), clock.clone()));
        let pheromones = Arc::new(PheromoneService::new(Arc::new(SqlitePheromoneRepository::new(pool.clone())), clock.clone(), push_hub.clone()));
        let blackboard = Arc::new(BlackboardService::new(Arc::new(SqliteBlackboardRepository::new(pool.clone())), clock.clone()));
        let checkpoints = Arc::new(CheckpointService::new(Arc::new(SqliteCheckpointRepository::new(pool.clone())), clock.clone()));

        Self {
            supervisor,
            spawn_queue,
            compound_driver,
            beliefs,
            bidding,
            consensus,
            credits,
            payoffs,
            pheromones,
            blackboard,
            checkpoints,
            push_hub,
            clock,
        }
    }

    /// Spawns the fleet-wide background tasks: health tick, spawn-queue
    /// tick, and pheromone decay. Per-worker reader tasks are spawned
    /// separately by the supervisor at `spawn()` time, not here.
    pub fn spawn_background_tasks(&self, health_tick_ms: u64, poll_interval_ms: u64, pheromone_decay: Option<PheromoneDecayConfig>) -> BackgroundTasks {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        handles.push({
            let supervisor = self.supervisor.clone();
            let stop_flag = stop_flag.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(health_tick_ms));
                while !stop_flag.load(Ordering::Acquire) {
                    interval.tick().await;
                    if let Err(e) = supervisor.health_tick().await {
                        error!(error = %e, "health tick failed");
                    }
                }
            })
        });

        handles.push({
            let spawn_queue = self.spawn_queue.clone();
            let stop_flag = stop_flag.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(poll_interval_ms));
                while !stop_flag.load(Ordering::Acquire) {
                    interval.tick().await;
                    if let Err(e) = spawn_queue.tick().await {
                        error!(error = %e, "spawn queue tick failed");
                    }
                }
            })
        });

        if let Some(decay) = pheromone_decay {
            let pheromones = self.pheromones.clone();
            let stop_flag = stop_flag.clone();
            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(decay.interval_ms));
                while !stop_flag.load(Ordering::Acquire) {
                    interval.tick().await;
                    match pheromones.process_decay(decay.rate, decay.min_intensity).await {
                        Ok(result) => info!(decayed = result.decayed, removed = result.removed, "pheromone decay tick"),
                        Err(e) => error!(error = %e, "pheromone decay failed"),
                    }
                }
            }));
        }

        info!(task_count = handles.len(), "background tasks started");
        BackgroundTasks { stop_flag, handles }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

/// Tunables for the optional pheromone-decay background task.
#[derive(Debug, Clone, Copy)]
pub struct PheromoneDecayConfig {
    pub interval_ms: u64,
    pub rate: f64,
    pub min_intensity: f64,
}

impl Default for PheromoneDecayConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000, rate: 0.05, min_intensity: 0.01 }
    }
}
