//! Shared test scaffolding for the integration suite: an in-memory
//! database per test and a fake agent launcher standing in for the real
//! external CLI process.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use fleetd::domain::errors::{FleetError, FleetResult};
use fleetd::domain::ports::{AgentLauncher, LaunchRequest, LaunchedProcess};
use fleetd::infrastructure::database::DatabaseConnection;
use tokio::sync::mpsc;

/// Opens a fresh migrated in-memory database, isolated per call.
pub async fn fresh_db() -> DatabaseConnection {
    let db = DatabaseConnection::new("sqlite::memory:").await.expect("open in-memory database");
    db.migrate().await.expect("run migrations");
    db
}

struct LaunchedState {
    alive: bool,
    output_tx: Option<mpsc::Sender<String>>,
    output_taken: bool,
}

/// Records every process lifecycle call against a handle without spawning
/// anything. `launch` always succeeds unless the handle was pre-listed in
/// `fail_on_launch`.
#[derive(Default)]
pub struct FakeAgentLauncher {
    state: Mutex<HashMap<String, LaunchedState>>,
    fail_on_launch: Mutex<Vec<String>>,
}

impl FakeAgentLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `launch` for this handle fail with `SpawnFailed`.
    pub fn fail_next_launch(&self, handle: &str) {
        self.fail_on_launch.lock().unwrap().push(handle.to_string());
    }

    /// Pushes a line into a launched worker's output stream, as if the
    /// external process had printed it.
    pub fn push_output(&self, handle: &str, line: &str) {
        let tx = {
            let state = self.state.lock().unwrap();
            state.get(handle).and_then(|s| s.output_tx.clone())
        };
        if let Some(tx) = tx {
            let _ = tx.try_send(line.to_string());
        }
    }
}

#[async_trait]
impl AgentLauncher for FakeAgentLauncher {
    async fn launch(&self, request: LaunchRequest) -> FleetResult<LaunchedProcess> {
        let mut fail_list = self.fail_on_launch.lock().unwrap();
        if let Some(pos) = fail_list.iter().position(|h| h == &request.handle) {
            fail_list.remove(pos);
            return Err(FleetError::SpawnFailed(format!("fake launch failure for '{}'", request.handle)));
        }
        drop(fail_list);

        self.state
            .lock()
            .unwrap()
            .insert(request.handle.clone(), LaunchedState { alive: true, output_tx: None, output_taken: false });
        Ok(LaunchedProcess { pid: Some(4242) })
    }

    async fn take_output_lines(&self, handle: &str) -> FleetResult<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(64);
        let mut state = self.state.lock().unwrap();
        let entry = state.get_mut(handle).ok_or_else(|| FleetError::NotFound(format!("no launched process for '{handle}'")))?;
        if entry.output_taken {
            return Err(FleetError::Conflict(format!("output already taken for '{handle}'")));
        }
        entry.output_tx = Some(tx);
        entry.output_taken = true;
        Ok(rx)
    }

    async fn send_input(&self, handle: &str, _line: &str) -> FleetResult<()> {
        if self.state.lock().unwrap().contains_key(handle) {
            Ok(())
        } else {
            Err(FleetError::NotFound(format!("no launched process for '{handle}'")))
        }
    }

    async fn signal_stop(&self, handle: &str) -> FleetResult<()> {
        if let Some(entry) = self.state.lock().unwrap().get_mut(handle) {
            entry.alive = false;
        }
        Ok(())
    }

    async fn force_kill(&self, handle: &str) -> FleetResult<()> {
        if let Some(entry) = self.state.lock().unwrap().get_mut(handle) {
            entry.alive = false;
        }
        Ok(())
    }

    async fn is_alive(&self, handle: &str) -> FleetResult<bool> {
        Ok(self.state.lock().unwrap().get(handle).map(|s| s.alive).unwrap_or(false))
    }
}
