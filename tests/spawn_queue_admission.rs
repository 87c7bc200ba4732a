//! Spawn queue admission and dependency-ordered release, against real
//! SQLite-backed repositories and the worker supervisor it feeds.

mod support;

use std::sync::Arc;

use fleetd::domain::models::{Priority, Role, SpawnMode, SpawnPayload};
use fleetd::domain::ports::WorkerRepository;
use fleetd::infrastructure::clock::SystemClock;
use fleetd::infrastructure::sqlite::{SqliteSpawnQueueRepository, SqliteSwarmRepository, SqliteWorkerRepository};
use fleetd::services::push_hub::PushHub;
use fleetd::services::spawn_queue::{SpawnQueueConfig, SpawnQueueService};
use fleetd::services::worker_supervisor::{SpawnRequest, SupervisorConfig, WorkerSupervisor};
use support::{fresh_db, FakeAgentLauncher};

#[tokio::test]
async fn dependent_item_is_held_until_its_dependency_spawns() {
    let db = fresh_db().await;
    let workers = Arc::new(SqliteWorkerRepository::new(db.pool().clone()));
    let swarms = Arc::new(SqliteSwarmRepository::new(db.pool().clone()));
    let launcher = Arc::new(FakeAgentLauncher::new());
    let clock = Arc::new(SystemClock);
    let push_hub = PushHub::new(32);

    let supervisor = Arc::new(WorkerSupervisor::new(
        workers.clone(),
        swarms.clone(),
        launcher.clone(),
        clock.clone(),
        push_hub.clone(),
        SupervisorConfig { dismiss_grace_ms: 0, ..Default::default() },
    ));

    // The requester for every enqueued item must itself be a live worker.
    let coordinator = supervisor
        .spawn(SpawnRequest {
            handle: "coord".to_string(),
            role: Role::Coordinator,
            team_name: "alpha".to_string(),
            working_dir: "/tmp/alpha".to_string(),
            initial_prompt: None,
            session_id: None,
            swarm_id: None,
            spawn_mode: SpawnMode::Native,
            depth_level: 0,
            caller_role: Role::Coordinator,
        })
        .await
        .expect("spawn coordinator");

    let queue_repo = Arc::new(SqliteSpawnQueueRepository::new(db.pool().clone()));
    let queue = SpawnQueueService::new(
        queue_repo,
        workers.clone(),
        supervisor.clone(),
        clock.clone(),
        push_hub.clone(),
        SpawnQueueConfig { fanout_per_tick: 10, ..Default::default() },
    );

    let first = queue
        .enqueue(coordinator.handle.clone(), Role::Coordinator, 0, "worker".to_string(), Priority::Normal, Vec::new(), SpawnPayload { task: "first".into(), ..Default::default() })
        .await
        .expect("enqueue first item");

    let second = queue
        .enqueue(
            coordinator.handle.clone(),
            Role::Coordinator,
            0,
            "worker".to_string(),
            Priority::Critical,
            vec![first.id.clone()],
            SpawnPayload { task: "second".into(), ..Default::default() },
        )
        .await
        .expect("enqueue dependent item");
    assert_eq!(second.blocked_by_count, 1);
    assert!(!second.is_ready());

    // First tick: only the unblocked item is eligible, despite the blocked
    // item carrying higher priority.
    queue.tick().await.expect("first tick");

    let live_workers = workers.list(Default::default()).await.expect("list workers");
    assert_eq!(live_workers.len(), 2, "only the coordinator and the first spawned worker should exist");

    // Dependency released by the first item's successful spawn.
    let second_after = queue_repo_get(&db, &second.id).await;
    assert_eq!(second_after.blocked_by_count, 0);
    assert!(second_after.is_ready());

    // Second tick: the now-unblocked item is scheduled.
    queue.tick().await.expect("second tick");
    let live_workers = workers.list(Default::default()).await.expect("list workers");
    assert_eq!(live_workers.len(), 3);

    db.close().await;
}

async fn queue_repo_get(db: &fleetd::infrastructure::database::DatabaseConnection, id: &str) -> fleetd::domain::models::SpawnQueueItem {
    use fleetd::domain::ports::SpawnQueueRepository;
    let repo = SqliteSpawnQueueRepository::new(db.pool().clone());
    repo.get(id).await.expect("query spawn queue item").expect("item exists")
}

#[tokio::test]
async fn depth_over_the_cap_is_rejected_at_enqueue_time() {
    let db = fresh_db().await;
    let workers = Arc::new(SqliteWorkerRepository::new(db.pool().clone()));
    let swarms = Arc::new(SqliteSwarmRepository::new(db.pool().clone()));
    let launcher = Arc::new(FakeAgentLauncher::new());
    let clock = Arc::new(SystemClock);
    let push_hub = PushHub::new(32);
    let supervisor = Arc::new(WorkerSupervisor::new(workers.clone(), swarms, launcher, clock.clone(), push_hub.clone(), SupervisorConfig::default()));
    let queue_repo = Arc::new(SqliteSpawnQueueRepository::new(db.pool().clone()));
    let config = SpawnQueueConfig::default();
    let max_depth = config.max_depth;
    let queue = SpawnQueueService::new(queue_repo, workers, supervisor, clock, push_hub, config);

    let err = queue
        .enqueue("coord".to_string(), Role::Coordinator, max_depth, "worker".to_string(), Priority::Normal, Vec::new(), SpawnPayload::default())
        .await
        .expect_err("depth beyond the cap should be rejected");
    assert_eq!(err.kind(), "invariant_violation");

    db.close().await;
}

#[tokio::test]
async fn non_spawning_role_cannot_enqueue() {
    let db = fresh_db().await;
    let workers = Arc::new(SqliteWorkerRepository::new(db.pool().clone()));
    let swarms = Arc::new(SqliteSwarmRepository::new(db.pool().clone()));
    let launcher = Arc::new(FakeAgentLauncher::new());
    let clock = Arc::new(SystemClock);
    let push_hub = PushHub::new(32);
    let supervisor = Arc::new(WorkerSupervisor::new(workers.clone(), swarms, launcher, clock.clone(), push_hub.clone(), SupervisorConfig::default()));
    let queue_repo = Arc::new(SqliteSpawnQueueRepository::new(db.pool().clone()));
    let queue = SpawnQueueService::new(queue_repo, workers, supervisor, clock, push_hub, SpawnQueueConfig::default());

    let err = queue
        .enqueue("scout-1".to_string(), Role::Scout, 0, "worker".to_string(), Priority::Normal, Vec::new(), SpawnPayload::default())
        .await
        .expect_err("scout should not be able to enqueue a spawn request");
    assert_eq!(err.kind(), "forbidden");

    db.close().await;
}
