//! Worker domain model.
//!
//! A worker is a managed external process wrapping an LLM-driven coding
//! agent. Workers are owned by the supervisor (`services::worker_supervisor`)
//! and persisted through [`crate::domain::ports::WorkerRepository`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default depth cap for spawned worker trees.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Bound on the in-memory recent-output ring.
pub const MAX_RECENT_OUTPUT_LINES: usize = 1000;

/// Role a worker plays within a swarm. Drives the permission matrix below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    Worker,
    Scout,
    Kraken,
    Oracle,
    Critic,
    Architect,
    Merger,
    Monitor,
    Notifier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Worker => "worker",
            Self::Scout => "scout",
            Self::Kraken => "kraken",
            Self::Oracle => "oracle",
            Self::Critic => "critic",
            Self::Architect => "architect",
            Self::Merger => "merger",
            Self::Monitor => "monitor",
            Self::Notifier => "notifier",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "coordinator" => Some(Self::Coordinator),
            "worker" => Some(Self::Worker),
            "scout" => Some(Self::Scout),
            "kraken" => Some(Self::Kraken),
            "oracle" => Some(Self::Oracle),
            "critic" => Some(Self::Critic),
            "architect" => Some(Self::Architect),
            "merger" => Some(Self::Merger),
            "monitor" => Some(Self::Monitor),
            "notifier" => Some(Self::Notifier),
            _ => None,
        }
    }

    /// `true` if a worker of this role is restartable on health exhaustion.
    /// Every role except `notifier` is stateless-restartable.
    pub fn is_restartable(&self) -> bool {
        !matches!(self, Self::Notifier)
    }

    pub fn can_spawn(&self) -> bool {
        matches!(self, Self::Coordinator)
    }

    pub fn can_dismiss(&self) -> bool {
        matches!(self, Self::Coordinator)
    }

    pub fn can_assign(&self) -> bool {
        matches!(self, Self::Coordinator | Self::Architect)
    }

    pub fn can_broadcast(&self) -> bool {
        matches!(self, Self::Coordinator | Self::Monitor)
    }

    pub fn can_merge(&self) -> bool {
        matches!(self, Self::Coordinator | Self::Merger)
    }

    pub fn can_push(&self) -> bool {
        matches!(self, Self::Coordinator | Self::Merger)
    }

    /// Every role except `worker`, `notifier`, and `kraken` can read the
    /// full fleet state.
    pub fn can_read_all(&self) -> bool {
        !matches!(self, Self::Worker | Self::Notifier | Self::Kraken)
    }

    /// Every role can `notify`.
    pub fn can_notify(&self) -> bool {
        true
    }
}

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Starting,
    Ready,
    Working,
    Stopping,
    Stopped,
    Dismissed,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Working => "working",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Dismissed => "dismissed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "starting" => Some(Self::Starting),
            "ready" => Some(Self::Ready),
            "working" => Some(Self::Working),
            "stopping" => Some(Self::Stopping),
            "stopped" => Some(Self::Stopped),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    /// `dismissed` is terminal; no transition leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dismissed)
    }
}

/// Health classification evaluated by the heartbeat state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "healthy" => Some(Self::Healthy),
            "degraded" => Some(Self::Degraded),
            "unhealthy" => Some(Self::Unhealthy),
            _ => None,
        }
    }
}

/// How a worker's process was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Plain child process, managed entirely by the supervisor.
    Process,
    /// Launched inside a tmux pane (interactive-terminal collaborator).
    Tmux,
    /// Launched by an external orchestrator; the supervisor only tracks it.
    External,
    /// Native in-process worker (no child process at all).
    Native,
}

impl SpawnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Tmux => "tmux",
            Self::External => "external",
            Self::Native => "native",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "process" => Some(Self::Process),
            "tmux" => Some(Self::Tmux),
            "external" => Some(Self::External),
            "native" => Some(Self::Native),
            _ => None,
        }
    }

    /// Only `process`-mode workers are eligible for the supervisor's
    /// auto-restart rule.
    pub fn is_restart_managed(&self) -> bool {
        matches!(self, Self::Process)
    }
}

/// A managed worker.
///
/// `recent_output` is explicitly excluded from persistence: it is a bounded
/// ring kept in memory only. Repositories persist every other field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub handle: String,
    pub team_name: String,
    pub role: Role,
    pub state: WorkerState,
    pub health: Health,
    pub pid: Option<u32>,
    pub session_id: Option<String>,
    pub worktree_path: Option<String>,
    pub branch: Option<String>,
    pub swarm_id: Option<String>,
    pub depth_level: u32,
    pub restart_count: u32,
    pub last_heartbeat: i64,
    pub spawned_at: i64,
    pub dismissed_at: Option<i64>,
    pub spawn_mode: SpawnMode,

    #[serde(skip)]
    pub recent_output: VecDeque<String>,
}

impl Worker {
    pub fn new(
        id: String,
        handle: String,
        team_name: String,
        role: Role,
        depth_level: u32,
        spawn_mode: SpawnMode,
        now: i64,
    ) -> Self {
        Self {
            id,
            handle,
            team_name,
            role,
            state: WorkerState::Starting,
            health: Health::Healthy,
            pid: None,
            session_id: None,
            worktree_path: None,
            branch: None,
            swarm_id: None,
            depth_level,
            restart_count: 0,
            last_heartbeat: now,
            spawned_at: now,
            dismissed_at: None,
            spawn_mode,
            recent_output: VecDeque::new(),
        }
    }

    /// `state=ready` implies `session_id != null`.
    pub fn satisfies_ready_invariant(&self) -> bool {
        self.state != WorkerState::Ready || self.session_id.is_some()
    }

    /// `depth_level <= MAX_DEPTH`.
    pub fn satisfies_depth_invariant(&self, max_depth: u32) -> bool {
        self.depth_level <= max_depth
    }

    /// Append a line to the bounded recent-output ring, most-recent-last.
    pub fn push_output_line(&mut self, line: String) {
        self.recent_output.push_back(line);
        while self.recent_output.len() > MAX_RECENT_OUTPUT_LINES {
            self.recent_output.pop_front();
        }
    }

    /// Most-recent-last snapshot of at most `limit` lines.
    pub fn recent_output_snapshot(&self, limit: usize) -> Vec<String> {
        let limit = limit.min(MAX_RECENT_OUTPUT_LINES);
        let skip = self.recent_output.len().saturating_sub(limit);
        self.recent_output.iter().skip(skip).cloned().collect()
    }
}

/// Aggregate counts returned by `getStatus`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetStatus {
    pub total: usize,
    pub by_state: std::collections::HashMap<String, usize>,
    pub by_role: std::collections::HashMap<String, usize>,
    pub by_health: std::collections::HashMap<String, usize>,
    pub restarts_total: u64,
    pub restarts_last_hour: u64,
    pub uptime_ms: i64,
}

/// Filter criteria for `listWorkers`.
#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub state: Option<WorkerState>,
    pub role: Option<Role>,
    pub swarm_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_invariant_requires_session_id() {
        let mut w = Worker::new(
            "w1".into(),
            "alpha".into(),
            "t1".into(),
            Role::Worker,
            0,
            SpawnMode::Process,
            0,
        );
        assert!(w.satisfies_ready_invariant());
        w.state = WorkerState::Ready;
        assert!(!w.satisfies_ready_invariant());
        w.session_id = Some("sess-1".into());
        assert!(w.satisfies_ready_invariant());
    }

    #[test]
    fn recent_output_ring_is_bounded() {
        let mut w = Worker::new(
            "w1".into(),
            "alpha".into(),
            "t1".into(),
            Role::Worker,
            0,
            SpawnMode::Process,
            0,
        );
        for i in 0..(MAX_RECENT_OUTPUT_LINES + 10) {
            w.push_output_line(format!("line-{i}"));
        }
        assert_eq!(w.recent_output.len(), MAX_RECENT_OUTPUT_LINES);
        assert_eq!(w.recent_output.front().unwrap(), "line-10");
    }

    #[test]
    fn role_permission_matrix_matches_expected_capabilities() {
        assert!(Role::Coordinator.can_spawn());
        assert!(!Role::Architect.can_spawn());
        assert!(Role::Architect.can_assign());
        assert!(!Role::Worker.can_assign());
        assert!(Role::Monitor.can_broadcast());
        assert!(!Role::Scout.can_broadcast());
        assert!(Role::Merger.can_merge() && Role::Merger.can_push());
        assert!(!Role::Worker.can_read_all());
        assert!(!Role::Kraken.can_read_all());
        assert!(!Role::Notifier.can_read_all());
        assert!(!Role::Notifier.is_restartable());
        assert!(Role::Worker.is_restartable());
    }
}
