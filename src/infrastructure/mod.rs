//! Concrete adapters implementing the domain ports: SQLite persistence,
//! configuration loading, logging/audit, the event-stream parser, process
//! management, git invocation, and the system clock.

pub mod clock;
pub mod config;
pub mod database;
pub mod git;
pub mod logging;
pub mod parser;
pub mod process;
pub mod sqlite;
