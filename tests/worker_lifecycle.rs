//! Spawn/dismiss lifecycle against real SQLite-backed repositories.

mod support;

use std::sync::Arc;

use fleetd::domain::models::{Role, SpawnMode, WorkerFilter, WorkerState};
use fleetd::infrastructure::clock::SystemClock;
use fleetd::infrastructure::sqlite::{SqliteSwarmRepository, SqliteWorkerRepository};
use fleetd::services::push_hub::PushHub;
use fleetd::services::worker_supervisor::{SpawnRequest, SupervisorConfig, WorkerSupervisor};
use support::{fresh_db, FakeAgentLauncher};

fn spawn_request(handle: &str) -> SpawnRequest {
    SpawnRequest {
        handle: handle.to_string(),
        role: Role::Worker,
        team_name: "alpha".to_string(),
        working_dir: "/tmp/alpha".to_string(),
        initial_prompt: Some("implement the thing".to_string()),
        session_id: None,
        swarm_id: None,
        spawn_mode: SpawnMode::Native,
        depth_level: 1,
        caller_role: Role::Coordinator,
    }
}

async fn supervisor() -> (WorkerSupervisor<SqliteWorkerRepository, SqliteSwarmRepository, FakeAgentLauncher, SystemClock>, fleetd::infrastructure::database::DatabaseConnection) {
    let db = fresh_db().await;
    let workers = Arc::new(SqliteWorkerRepository::new(db.pool().clone()));
    let swarms = Arc::new(SqliteSwarmRepository::new(db.pool().clone()));
    let launcher = Arc::new(FakeAgentLauncher::new());
    let clock = Arc::new(SystemClock);
    let push_hub = PushHub::new(32);
    let config = SupervisorConfig { dismiss_grace_ms: 0, ..Default::default() };
    let supervisor = WorkerSupervisor::new(workers, swarms, launcher, clock, push_hub, config);
    (supervisor, db)
}

#[tokio::test]
async fn spawn_then_dismiss_round_trip() {
    let (supervisor, db) = supervisor().await;

    let worker = supervisor.spawn(spawn_request("w-1")).await.expect("spawn should succeed");
    assert_eq!(worker.state, WorkerState::Ready);

    let listed = supervisor.list_workers(WorkerFilter::default()).await.expect("list workers");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].handle, "w-1");

    let dismissed = supervisor.dismiss("w-1", Role::Coordinator).await.expect("dismiss should succeed");
    assert!(dismissed);

    let after = supervisor.get_worker("w-1").await.expect("lookup after dismiss").expect("worker still recorded");
    assert_eq!(after.state, WorkerState::Dismissed);
    assert!(after.dismissed_at.is_some());

    // Idempotent: dismissing an already-dismissed worker returns false, not an error.
    let second = supervisor.dismiss("w-1", Role::Coordinator).await.expect("second dismiss should not error");
    assert!(!second);

    db.close().await;
}

#[tokio::test]
async fn duplicate_handle_is_rejected_while_the_first_is_live() {
    let (supervisor, db) = supervisor().await;

    supervisor.spawn(spawn_request("dup")).await.expect("first spawn should succeed");
    let err = supervisor.spawn(spawn_request("dup")).await.expect_err("second spawn should conflict");
    assert_eq!(err.kind(), "conflict");

    // Once dismissed, the handle is free for reuse.
    supervisor.dismiss("dup", Role::Coordinator).await.expect("dismiss");
    let reused = supervisor.spawn(spawn_request("dup")).await.expect("handle should be reusable after dismissal");
    assert_eq!(reused.handle, "dup");

    db.close().await;
}

#[tokio::test]
async fn non_coordinator_cannot_spawn_or_dismiss() {
    let (supervisor, db) = supervisor().await;

    let mut request = spawn_request("forbidden");
    request.caller_role = Role::Scout;
    let err = supervisor.spawn(request).await.expect_err("scout should not be able to spawn");
    assert_eq!(err.kind(), "forbidden");

    supervisor.spawn(spawn_request("ok")).await.expect("coordinator spawn should succeed");
    let err = supervisor.dismiss("ok", Role::Scout).await.expect_err("scout should not be able to dismiss");
    assert_eq!(err.kind(), "forbidden");

    db.close().await;
}

#[tokio::test]
async fn depth_beyond_max_depth_is_an_invariant_violation() {
    let (supervisor, db) = supervisor().await;

    let mut request = spawn_request("too-deep");
    request.depth_level = SupervisorConfig::default().max_depth + 1;
    let err = supervisor.spawn(request).await.expect_err("depth over the cap should fail");
    assert_eq!(err.kind(), "invariant_violation");

    db.close().await;
}
