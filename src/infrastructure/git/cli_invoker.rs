use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::ports::GitPort;

/// Invokes the `git` binary on `PATH` for every operation. Stateless; one
/// instance is shared across all swarms.
pub struct CliGitInvoker;

impl CliGitInvoker {
    pub const fn new() -> Self {
        Self
    }

    async fn run(&self, repo_path: &str, args: &[&str]) -> FleetResult<std::process::Output> {
        debug!(repo_path, ?args, "invoking git");
        Command::new("git")
            .current_dir(repo_path)
            .args(args)
            .output()
            .await
            .map_err(|e| FleetError::Internal(format!("failed to spawn git {args:?}: {e}")))
    }

    async fn run_ok(&self, repo_path: &str, args: &[&str]) -> FleetResult<()> {
        let output = self.run(repo_path, args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(FleetError::Internal(format!(
                "git {args:?} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}

impl Default for CliGitInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GitPort for CliGitInvoker {
    async fn current_branch(&self, repo_path: &str) -> FleetResult<String> {
        let output = self.run(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            return Err(FleetError::Internal(format!(
                "git rev-parse failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn porcelain_status(&self, repo_path: &str) -> FleetResult<String> {
        let output = self.run(repo_path, &["status", "--porcelain"]).await?;
        if !output.status.success() {
            return Err(FleetError::Internal(format!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn checkout_new(&self, repo_path: &str, name: &str, from: &str) -> FleetResult<()> {
        self.run_ok(repo_path, &["checkout", "-b", name, from]).await
    }

    async fn commit_all(&self, repo_path: &str, message: &str) -> FleetResult<()> {
        self.run_ok(repo_path, &["add", "-A"]).await?;
        self.run_ok(repo_path, &["commit", "-m", message]).await
    }

    async fn stash_push(&self, repo_path: &str, label: &str) -> FleetResult<()> {
        self.run_ok(repo_path, &["stash", "push", "-u", "-m", label]).await
    }

    async fn stash_pop(&self, repo_path: &str) -> FleetResult<()> {
        self.run_ok(repo_path, &["stash", "pop"]).await
    }

    async fn checkout(&self, repo_path: &str, name: &str) -> FleetResult<()> {
        self.run_ok(repo_path, &["checkout", name]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn init_repo() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        Command::new("git").current_dir(path).args(["init", "-q"]).output().await.unwrap();
        Command::new("git")
            .current_dir(path)
            .args(["config", "user.email", "test@example.com"])
            .output()
            .await
            .unwrap();
        Command::new("git")
            .current_dir(path)
            .args(["config", "user.name", "test"])
            .output()
            .await
            .unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();
        Command::new("git").current_dir(path).args(["add", "-A"]).output().await.unwrap();
        Command::new("git")
            .current_dir(path)
            .args(["commit", "-q", "-m", "initial"])
            .output()
            .await
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn current_branch_reports_default_branch() {
        let repo = init_repo().await;
        let invoker = CliGitInvoker::new();
        let branch = invoker.current_branch(repo.path().to_str().unwrap()).await.unwrap();
        assert!(branch == "main" || branch == "master");
    }

    #[tokio::test]
    async fn checkout_new_then_status_is_clean() {
        let repo = init_repo().await;
        let path = repo.path().to_str().unwrap();
        let invoker = CliGitInvoker::new();
        invoker.checkout_new(path, "feature/x", "HEAD").await.unwrap();
        assert_eq!(invoker.current_branch(path).await.unwrap(), "feature/x");
        assert!(invoker.porcelain_status(path).await.unwrap().is_empty());
    }
}
