//! Git invoker port. The compound driver depends only on this interface;
//! it never shells out to `git` directly.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;

#[async_trait]
pub trait GitPort: Send + Sync {
    async fn current_branch(&self, repo_path: &str) -> FleetResult<String>;

    async fn porcelain_status(&self, repo_path: &str) -> FleetResult<String>;

    async fn checkout_new(&self, repo_path: &str, name: &str, from: &str) -> FleetResult<()>;

    async fn commit_all(&self, repo_path: &str, message: &str) -> FleetResult<()>;

    async fn stash_push(&self, repo_path: &str, label: &str) -> FleetResult<()>;

    async fn stash_pop(&self, repo_path: &str) -> FleetResult<()>;

    async fn checkout(&self, repo_path: &str, name: &str) -> FleetResult<()>;
}
