//! Agent launcher port: starts and tears down the external process backing
//! a worker.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::SpawnMode;

/// Parameters needed to start a worker's external process.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub handle: String,
    pub working_dir: String,
    pub initial_prompt: Option<String>,
    pub resume_session_id: Option<String>,
    pub spawn_mode: SpawnMode,
}

/// A running worker process, as seen by the supervisor. `pid` is `None` for
/// `spawn_mode=native` workers that have no OS process of their own.
#[derive(Debug, Clone, Copy)]
pub struct LaunchedProcess {
    pub pid: Option<u32>,
}

/// Starts, signals, and terminates the external CLI process behind a
/// worker. Implementations own the child's stdio; line-by-line output is
/// handed off to the event-stream parser by the caller, not by this port.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Spawn the external process. Returns `SpawnFailed` if the launcher
    /// cannot find the executable or the process exits immediately.
    async fn launch(&self, request: LaunchRequest) -> FleetResult<LaunchedProcess>;

    /// Hand off the process's stdout, one line per message, to the caller.
    /// Callable exactly once per launch; the caller (the supervisor) owns
    /// feeding lines to the event-stream parser from here on. `NotFound`
    /// if the handle has no tracked process or its output was already taken.
    async fn take_output_lines(&self, handle: &str) -> FleetResult<tokio::sync::mpsc::Receiver<String>>;

    /// Write a line to the process's stdin, used for non-persistent
    /// broadcast delivery.
    async fn send_input(&self, handle: &str, line: &str) -> FleetResult<()>;

    /// Request graceful shutdown (e.g. SIGTERM); does not block on exit.
    async fn signal_stop(&self, handle: &str) -> FleetResult<()>;

    /// Forcefully terminate the process (e.g. SIGKILL), used once the grace
    /// period elapses.
    async fn force_kill(&self, handle: &str) -> FleetResult<()>;

    /// `true` if the process is still alive.
    async fn is_alive(&self, handle: &str) -> FleetResult<bool>;
}
