//! Hierarchical configuration for the fleet orchestration kernel.

mod loader;

pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".fleetd/fleet.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            retention_days: 14,
        }
    }
}

/// Kernel-level limits and timeouts, each overridable by an environment
/// variable of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_depth: u32,
    pub max_fleet: u32,
    pub max_restarts: u32,
    pub dismiss_grace_ms: u64,
    pub health_tick_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: crate::domain::models::DEFAULT_MAX_DEPTH,
            max_fleet: 50,
            max_restarts: 5,
            dismiss_grace_ms: 5_000,
            health_tick_ms: 10_000,
            poll_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushHubConfig {
    pub queue_capacity: usize,
}

impl Default for PushHubConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub limits: LimitsConfig,
    pub push_hub: PushHubConfig,
}
