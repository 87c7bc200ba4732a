//! Git safety: isolate the compound loop's commits on a fresh fleet branch
//! and guarantee the operator's working tree is restored on any exit path.
//!
//! Grounded on the teacher's `application/loop_executor.rs` checkpoint/
//! restore discipline, adapted from convergence-metric checkpoints to a
//! git stash/branch/restore sequence.

use crate::domain::errors::FleetResult;
use crate::domain::ports::GitPort;

/// Label prefix applied to stashes created by the compound loop, so a
/// human inspecting `git stash list` can recognize them.
const STASH_LABEL_PREFIX: &str = "fleetd-compound-loop";

/// Tracks what needs undoing when the compound loop exits, successfully or
/// not: the branch to return to, and whether a stash needs popping.
pub struct GitSafetyGuard {
    repo_path: String,
    original_branch: String,
    stashed: bool,
}

impl GitSafetyGuard {
    /// Snapshot the current branch, stash any dirty working tree under a
    /// recognizable label, and check out a new fleet branch from it.
    pub async fn begin(git: &dyn GitPort, repo_path: &str, fleet_branch: &str) -> FleetResult<Self> {
        let original_branch = git.current_branch(repo_path).await?;
        let status = git.porcelain_status(repo_path).await?;
        let stashed = !status.trim().is_empty();
        if stashed {
            git.stash_push(repo_path, &format!("{STASH_LABEL_PREFIX}-{fleet_branch}")).await?;
        }
        git.checkout_new(repo_path, fleet_branch, &original_branch).await?;
        Ok(Self { repo_path: repo_path.to_string(), original_branch, stashed })
    }

    /// Return to the original branch and pop the stash, if one was made.
    /// Best-effort: logs nothing itself, returns the first failure so the
    /// caller can decide whether to surface or swallow it.
    pub async fn restore(&self, git: &dyn GitPort) -> FleetResult<()> {
        git.checkout(&self.repo_path, &self.original_branch).await?;
        if self.stashed {
            git.stash_pop(&self.repo_path).await?;
        }
        Ok(())
    }

    pub fn original_branch(&self) -> &str {
        &self.original_branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGit {
        branch: Mutex<String>,
        dirty: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl GitPort for FakeGit {
        async fn current_branch(&self, _repo_path: &str) -> FleetResult<String> {
            Ok(self.branch.lock().unwrap().clone())
        }
        async fn porcelain_status(&self, _repo_path: &str) -> FleetResult<String> {
            Ok(if self.dirty { " M file.rs".to_string() } else { String::new() })
        }
        async fn checkout_new(&self, _repo_path: &str, name: &str, _from: &str) -> FleetResult<()> {
            self.calls.lock().unwrap().push(format!("checkout_new:{name}"));
            *self.branch.lock().unwrap() = name.to_string();
            Ok(())
        }
        async fn commit_all(&self, _repo_path: &str, _message: &str) -> FleetResult<()> {
            Ok(())
        }
        async fn stash_push(&self, _repo_path: &str, label: &str) -> FleetResult<()> {
            self.calls.lock().unwrap().push(format!("stash_push:{label}"));
            Ok(())
        }
        async fn stash_pop(&self, _repo_path: &str) -> FleetResult<()> {
            self.calls.lock().unwrap().push("stash_pop".to_string());
            Ok(())
        }
        async fn checkout(&self, _repo_path: &str, name: &str) -> FleetResult<()> {
            self.calls.lock().unwrap().push(format!("checkout:{name}"));
            *self.branch.lock().unwrap() = name.to_string();
            Ok(())
        }
    }

    #[tokio::test]
    async fn dirty_tree_is_stashed_then_restored() {
        let git = FakeGit { branch: Mutex::new("main".into()), dirty: true, calls: Mutex::new(vec![]) };
        let guard = GitSafetyGuard::begin(&git, "/repo", "fleet/fix-1").await.unwrap();
        assert_eq!(guard.original_branch(), "main");
        guard.restore(&git).await.unwrap();
        let calls = git.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["stash_push:fleetd-compound-loop-fleet/fix-1", "checkout_new:fleet/fix-1", "checkout:main", "stash_pop"]
        );
    }

    #[tokio::test]
    async fn clean_tree_skips_stash() {
        let git = FakeGit { branch: Mutex::new("main".into()), dirty: false, calls: Mutex::new(vec![]) };
        let guard = GitSafetyGuard::begin(&git, "/repo", "fleet/fix-2").await.unwrap();
        guard.restore(&git).await.unwrap();
        let calls = git.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.contains("stash")));
    }
}
