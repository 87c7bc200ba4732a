use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::SpawnMode;
use crate::domain::ports::{AgentLauncher, LaunchRequest, LaunchedProcess};

const OUTPUT_CHANNEL_CAPACITY: usize = 1024;

/// Spawns the worker's backing CLI process and keeps its [`Child`] handle
/// around for later signalling. One process per handle; re-launching a
/// live handle replaces the tracked child without killing the old one,
/// since the caller is expected to have already dismissed it.
pub struct AgentProcessLauncher {
    binary_name: String,
    children: Mutex<HashMap<String, Child>>,
    output: Mutex<HashMap<String, mpsc::Receiver<String>>>,
}

impl AgentProcessLauncher {
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            children: Mutex::new(HashMap::new()),
            output: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_binary(&self) -> FleetResult<std::path::PathBuf> {
        which::which(&self.binary_name)
            .map_err(|e| FleetError::SpawnFailed(format!("cannot locate '{}': {e}", self.binary_name)))
    }
}

#[async_trait]
impl AgentLauncher for AgentProcessLauncher {
    async fn launch(&self, request: LaunchRequest) -> FleetResult<LaunchedProcess> {
        if request.spawn_mode == SpawnMode::Native {
            // Native workers run in-process; there is no child to track.
            return Ok(LaunchedProcess { pid: None });
        }

        let bin = self.resolve_binary()?;
        let mut cmd = Command::new(&bin);
        cmd.current_dir(&request.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(session_id) = &request.resume_session_id {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(prompt) = &request.initial_prompt {
            cmd.arg("--print").arg(prompt);
        }

        info!(handle = %request.handle, path = ?bin, "spawning agent process");
        let mut child = cmd
            .spawn()
            .map_err(|e| FleetError::SpawnFailed(format!("failed to spawn '{}': {e}", request.handle)))?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
            let handle = request.handle.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            if tx.send(line).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(handle, error = %e, "error reading agent stdout");
                            break;
                        }
                    }
                }
            });
            self.output.lock().await.insert(request.handle.clone(), rx);
        }

        self.children.lock().await.insert(request.handle, child);
        Ok(LaunchedProcess { pid })
    }

    async fn take_output_lines(&self, handle: &str) -> FleetResult<mpsc::Receiver<String>> {
        self.output
            .lock()
            .await
            .remove(handle)
            .ok_or_else(|| FleetError::NotFound(format!("no output stream for '{handle}'")))
    }

    async fn send_input(&self, handle: &str, line: &str) -> FleetResult<()> {
        let mut children = self.children.lock().await;
        let child = children
            .get_mut(handle)
            .ok_or_else(|| FleetError::NotFound(format!("no running process for '{handle}'")))?;
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| FleetError::Internal(format!("'{handle}' has no stdin pipe")))?;
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| FleetError::Internal(format!("write to '{handle}' failed: {e}")))
    }

    async fn signal_stop(&self, handle: &str) -> FleetResult<()> {
        let children = self.children.lock().await;
        let Some(child) = children.get(handle) else {
            return Ok(());
        };
        let Some(pid) = child.id() else {
            return Ok(());
        };
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(handle, error = %e, "failed to send SIGTERM");
        }
        Ok(())
    }

    async fn force_kill(&self, handle: &str) -> FleetResult<()> {
        let mut children = self.children.lock().await;
        if let Some(mut child) = children.remove(handle) {
            if let Err(e) = child.kill().await {
                warn!(handle, error = %e, "failed to force-kill process");
            }
        }
        Ok(())
    }

    async fn is_alive(&self, handle: &str) -> FleetResult<bool> {
        let mut children = self.children.lock().await;
        let Some(child) = children.get_mut(handle) else {
            return Ok(false);
        };
        match child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(_)) => Ok(false),
            Err(e) => Err(FleetError::Internal(format!("wait() on '{handle}' failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_binary_reports_spawn_failed() {
        let launcher = AgentProcessLauncher::new("definitely-not-a-real-binary-xyz");
        let err = launcher
            .launch(LaunchRequest {
                handle: "alpha".into(),
                working_dir: ".".into(),
                initial_prompt: None,
                resume_session_id: None,
                spawn_mode: SpawnMode::Process,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn native_spawn_mode_tracks_no_process() {
        let launcher = AgentProcessLauncher::new("irrelevant");
        let launched = launcher
            .launch(LaunchRequest {
                handle: "alpha".into(),
                working_dir: ".".into(),
                initial_prompt: None,
                resume_session_id: None,
                spawn_mode: SpawnMode::Native,
            })
            .await
            .unwrap();
        assert!(launched.pid.is_none());
    }

    #[tokio::test]
    async fn is_alive_false_for_unknown_handle() {
        let launcher = AgentProcessLauncher::new("irrelevant");
        assert!(!launcher.is_alive("nobody").await.unwrap());
    }
}
