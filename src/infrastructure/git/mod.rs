//! Git invoker: shells out to the `git` CLI. The compound driver's git
//! safety net depends only on [`domain::ports::GitPort`]; this is its sole
//! production implementation.

mod cli_invoker;

pub use cli_invoker::CliGitInvoker;
