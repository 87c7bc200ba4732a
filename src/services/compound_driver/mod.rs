//! Compound iteration loop — component F, the multi-worker driver that
//! alternates "agents fix" and "gates validate" phases against a versioned
//! branch until success or exhaustion.
//!
//! Grounded on the teacher's `application/loop_executor.rs`
//! (`ConvergenceStrategy`, `LoopState`, iteration history, cancellation via
//! `tokio::select!`) generalized from a single numeric convergence metric
//! to the gate-pass/fail loop this spec describes, and
//! `application/agent_executor.rs`'s per-iteration `tokio::time::timeout`
//! handling.

pub mod feedback;
pub mod git_safety;
pub mod project_detect;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{Health, Role, SpawnMode, Swarm};
use crate::domain::ports::{AgentLauncher, Clock, GitPort, SwarmRepository, WorkerRepository};
use crate::services::push_hub::{Event, PushHub, Subject};
use crate::services::worker_supervisor::{SpawnRequest, WorkerSupervisor};

use feedback::{extract, GateFeedback, StructuredFeedback};
use git_safety::GitSafetyGuard;
use project_detect::{detect, gate_table, resolve_gates, Gate, ProjectType};

const MIN_WORKERS: usize = 1;
const MAX_WORKERS: usize = 5;
/// Marker the supervisor's output-ring scan looks for after the first
/// iteration, so "TASK COMPLETE" from a stale prompt isn't mistaken for the
/// current one.
const RE_ENGAGED_MARKER: &str = "RE-ENGAGED";
const TASK_COMPLETE_MARKER: &str = "TASK COMPLETE";

/// Tunables for the loop's timing, surfaced via the same environment
/// variables as the rest of the kernel.
#[derive(Debug, Clone)]
pub struct CompoundDriverConfig {
    pub poll_interval_ms: u64,
    pub gate_timeout_ms: u64,
    pub first_iteration_timeout_ms: u64,
    pub later_iteration_timeout_ms: u64,
}

impl Default for CompoundDriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            gate_timeout_ms: 120_000,
            first_iteration_timeout_ms: 10 * 60 * 1_000,
            later_iteration_timeout_ms: 5 * 60 * 1_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompoundRunRequest {
    pub objective: String,
    pub working_dir: String,
    pub team_name: String,
    pub num_workers: usize,
    pub max_iterations: u32,
    pub caller_role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRunResult {
    pub run_id: String,
    pub status: CompoundStatus,
    pub iterations: u32,
    pub branch: String,
    pub original_branch: String,
    pub feedback_history: Vec<StructuredFeedback>,
}

/// Orchestrates one compound run end to end. Generic over the same ports
/// as the worker supervisor it drives, plus the git invoker.
pub struct CompoundDriver<W, S, L, C, G>
where
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
    G: GitPort + 'static,
{
    supervisor: Arc<WorkerSupervisor<W, S, L, C>>,
    swarms: Arc<S>,
    clock: Arc<C>,
    git: Arc<G>,
    push_hub: PushHub,
    config: CompoundDriverConfig,
}

impl<W, S, L, C, G> CompoundDriver<W, S, L, C, G>
where
    W: WorkerRepository + 'static,
    S: SwarmRepository + 'static,
    L: AgentLauncher + 'static,
    C: Clock + 'static,
    G: GitPort + 'static,
{
    pub fn new(
        supervisor: Arc<WorkerSupervisor<W, S, L, C>>,
        swarms: Arc<S>,
        clock: Arc<C>,
        git: Arc<G>,
        push_hub: PushHub,
        config: CompoundDriverConfig,
    ) -> Self {
        Self { supervisor, swarms, clock, git, push_hub, config }
    }

    pub async fn run(&self, request: CompoundRunRequest) -> FleetResult<CompoundRunResult> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&request.num_workers) {
            return Err(FleetError::InvariantViolation(format!(
                "num_workers must be between {MIN_WORKERS} and {MAX_WORKERS}, got {}",
                request.num_workers
            )));
        }
        if request.max_iterations == 0 {
            return Err(FleetError::InvariantViolation("max_iterations must be at least 1".into()));
        }

        let project_type = detect(Path::new(&request.working_dir))
            .ok_or_else(|| FleetError::InvariantViolation("no recognized project type in working directory".into()))?;
        let (gates, dropped) = resolve_gates(gate_table(project_type));
        for reason in &dropped {
            warn!(reason, "gate dropped from compound run");
        }

        let run_id = Uuid::new_v4().to_string();
        let fleet_branch = format!("fleet/fix-{}", self.clock.now_ms() / 1000);

        let guard = GitSafetyGuard::begin(self.git.as_ref(), &request.working_dir, &fleet_branch).await?;

        let run_result = self
            .drive(&run_id, &fleet_branch, project_type, &gates, &request)
            .await;

        if let Err(e) = guard.restore(self.git.as_ref()).await {
            warn!(run_id, error = %e, "failed to restore original git state after compound run");
        }

        match run_result {
            Ok((status, iterations, history)) => {
                match status {
                    CompoundStatus::Succeeded => {
                        self.push_hub.publish(Subject::All, Event::CompoundSucceeded { run_id: run_id.clone() }).await;
                    }
                    CompoundStatus::Failed => {
                        self.push_hub
                            .publish(
                                Subject::All,
                                Event::CompoundFailed { run_id: run_id.clone(), reason: "iteration cap exhausted".into() },
                            )
                            .await;
                    }
                }
                Ok(CompoundRunResult {
                    run_id,
                    status,
                    iterations,
                    branch: fleet_branch,
                    original_branch: guard.original_branch().to_string(),
                    feedback_history: history,
                })
            }
            Err(e) => {
                self.push_hub
                    .publish(Subject::All, Event::CompoundFailed { run_id: run_id.clone(), reason: e.to_string() })
                    .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        run_id: &str,
        fleet_branch: &str,
        project_type: ProjectType,
        gates: &[Gate],
        request: &CompoundRunRequest,
    ) -> FleetResult<(CompoundStatus, u32, Vec<StructuredFeedback>)> {
        let now = self.clock.now_ms();
        let swarm = Swarm::new(Uuid::new_v4().to_string(), format!("compound-{run_id}"), request.num_workers as u32, now);
        self.swarms.create(&swarm).await?;
        self.push_hub.publish(Subject::All, Event::SwarmCreated { swarm_id: swarm.id.clone() }).await;

        let fixer_handle = format!("fixer-{}", &run_id[..8]);
        self.spawn_participant(&fixer_handle, &swarm.id, request).await?;

        let mut verifier_handles = Vec::with_capacity(request.num_workers - 1);
        for i in 1..request.num_workers {
            let handle = format!("verifier-{i}-{}", &run_id[..8]);
            self.spawn_participant(&handle, &swarm.id, request).await?;
            verifier_handles.push(handle);
        }

        let mut all_handles = vec![fixer_handle.clone()];
        all_handles.extend(verifier_handles.clone());

        let mut history = Vec::new();
        let mut iteration = 0u32;

        let final_status = loop {
            iteration += 1;
            self.push_hub
                .publish(Subject::Swarm(swarm.id.clone()), Event::CompoundIterationStart { run_id: run_id.to_string(), iteration })
                .await;

            let timeout_ms =
                if iteration == 1 { self.config.first_iteration_timeout_ms } else { self.config.later_iteration_timeout_ms };

            for handle in &all_handles {
                let done = self.wait_for_worker_done(handle, &request.working_dir, iteration, timeout_ms).await;
                if !done {
                    warn!(handle, iteration, "worker did not signal completion before timeout");
                }
            }

            self.commit_staged_changes(&request.working_dir, iteration).await?;

            let feedback = self.run_gates(project_type, gates, &request.working_dir).await;
            let all_passed = feedback.all_passed();
            history.push(feedback.clone());

            self.push_hub
                .publish(
                    Subject::Swarm(swarm.id.clone()),
                    Event::CompoundIterationComplete { run_id: run_id.to_string(), iteration },
                )
                .await;

            if all_passed {
                break CompoundStatus::Succeeded;
            }
            if iteration >= request.max_iterations {
                break CompoundStatus::Failed;
            }

            let prompt = render_feedback_prompt(&request.objective, &feedback, iteration);
            self.supervisor.broadcast(&prompt, request.caller_role).await?;
        };

        for handle in &all_handles {
            let _ = self.supervisor.dismiss(handle, request.caller_role).await;
        }

        info!(run_id, fleet_branch, iterations = iteration, ?final_status, "compound run finished");
        Ok((final_status, iteration, history))
    }

    async fn spawn_participant(&self, handle: &str, swarm_id: &str, request: &CompoundRunRequest) -> FleetResult<()> {
        self.supervisor
            .spawn(SpawnRequest {
                handle: handle.to_string(),
                role: Role::Worker,
                team_name: request.team_name.clone(),
                working_dir: request.working_dir.clone(),
                initial_prompt: Some(request.objective.clone()),
                session_id: None,
                swarm_id: Some(swarm_id.to_string()),
                spawn_mode: SpawnMode::Process,
                depth_level: 0,
                caller_role: request.caller_role,
            })
            .await?;
        Ok(())
    }

    /// Poll both the worker's sentinel file and its output ring for
    /// completion until `timeout_ms` elapses or the worker goes unhealthy.
    async fn wait_for_worker_done(&self, handle: &str, working_dir: &str, iteration: u32, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match self.supervisor.get_worker(handle).await {
                Ok(Some(worker)) => {
                    if worker.health == Health::Unhealthy {
                        return false;
                    }
                    if sentinel_path(working_dir, handle, iteration).exists() {
                        return true;
                    }
                    if ring_signals_complete(&worker.recent_output, iteration) {
                        return true;
                    }
                }
                Ok(None) => return false,
                Err(_) => return false,
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// Commit whatever the fixer staged this iteration. A clean tree (no
    /// worker made changes) is not an error.
    async fn commit_staged_changes(&self, working_dir: &str, iteration: u32) -> FleetResult<()> {
        let status = self.git.porcelain_status(working_dir).await?;
        if status.trim().is_empty() {
            return Ok(());
        }
        self.git.commit_all(working_dir, &format!("compound loop iteration {iteration}")).await
    }

    async fn run_gates(&self, project_type: ProjectType, gates: &[Gate], working_dir: &str) -> StructuredFeedback {
        let mut feedback = StructuredFeedback::default();
        for gate in gates {
            let (passed, output) = self.run_one_gate(working_dir, gate).await;
            feedback.push(extract(project_type, gate.name, passed, &output));
        }
        feedback
    }

    async fn run_one_gate(&self, working_dir: &str, gate: &Gate) -> (bool, String) {
        let invocation = Command::new(gate.program).args(&gate.args).current_dir(working_dir).output();
        match tokio::time::timeout(Duration::from_millis(self.config.gate_timeout_ms), invocation).await {
            Ok(Ok(output)) => {
                let combined = format!("{}{}", String::from_utf8_lossy(&output.stdout), String::from_utf8_lossy(&output.stderr));
                (output.status.success(), combined)
            }
            Ok(Err(e)) => (false, format!("failed to run gate '{}': {e}", gate.name)),
            Err(_) => (false, format!("gate '{}' timed out after {}ms", gate.name, self.config.gate_timeout_ms)),
        }
    }
}

fn sentinel_path(working_dir: &str, handle: &str, iteration: u32) -> std::path::PathBuf {
    Path::new(working_dir).join(".fleetd").join("sentinels").join(format!("{handle}-iter{iteration}.done"))
}

/// `true` if the worker's output ring contains the literal completion
/// marker, scoped to text after the last `RE-ENGAGED` marker once past the
/// first iteration (so a stale "TASK COMPLETE" from a prior round doesn't
/// satisfy the current one).
fn ring_signals_complete(ring: &VecDeque<String>, iteration: u32) -> bool {
    if iteration > 1 {
        match ring.iter().rposition(|line| line.contains(RE_ENGAGED_MARKER)) {
            Some(idx) => ring.iter().skip(idx + 1).any(|line| line.contains(TASK_COMPLETE_MARKER)),
            None => false,
        }
    } else {
        ring.iter().any(|line| line.contains(TASK_COMPLETE_MARKER))
    }
}

fn render_feedback_prompt(objective: &str, feedback: &StructuredFeedback, iteration: u32) -> String {
    let mut out = format!("{RE_ENGAGED_MARKER} iteration {}\nObjective: {objective}\n", iteration + 1);
    for gate in &feedback.gates {
        if gate.passed {
            continue;
        }
        append_gate_summary(&mut out, gate);
    }
    out
}

fn append_gate_summary(out: &mut String, gate: &GateFeedback) {
    out.push_str(&format!("Gate '{}' failed:\n", gate.gate_name));
    if gate.errors.is_empty() {
        for line in &gate.raw_tail {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    } else {
        for err in &gate.errors {
            let location = match (&err.file, err.line) {
                (Some(f), Some(l)) => format!("{f}:{l}: "),
                (Some(f), None) => format!("{f}: "),
                _ => String::new(),
            };
            out.push_str(&format!("  {location}{}\n", err.message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_scans_only_after_last_re_engaged_on_later_iterations() {
        let mut ring = VecDeque::new();
        ring.push_back("TASK COMPLETE".to_string());
        ring.push_back("RE-ENGAGED iteration 2".to_string());
        ring.push_back("still working".to_string());
        assert!(!ring_signals_complete(&ring, 2));
        ring.push_back("TASK COMPLETE".to_string());
        assert!(ring_signals_complete(&ring, 2));
    }

    #[test]
    fn first_iteration_ignores_re_engaged_scoping() {
        let mut ring = VecDeque::new();
        ring.push_back("TASK COMPLETE".to_string());
        assert!(ring_signals_complete(&ring, 1));
    }

    #[test]
    fn feedback_prompt_includes_failing_gate_names() {
        let mut feedback = StructuredFeedback::default();
        feedback.push(extract(ProjectType::Rust, "tests", false, "error[E0001]: bad\n --> src/lib.rs:1:1"));
        let prompt = render_feedback_prompt("fix the bug", &feedback, 1);
        assert!(prompt.contains("RE-ENGAGED iteration 2"));
        assert!(prompt.contains("Gate 'tests' failed"));
        assert!(prompt.contains("src/lib.rs:1"));
    }
}
