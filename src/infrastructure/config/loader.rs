use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::Config;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid max_fleet: {0}, must be between 1 and 1000")]
    InvalidMaxFleet(u32),

    #[error("invalid max_depth: {0}, must be at least 1")]
    InvalidMaxDepth(u32),

    #[error("invalid log level: {0}, must be one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}, must be one of json, pretty")]
    InvalidLogFormat(String),

    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("invalid max_connections: {0}, must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Loads [`Config`] with defaults overridden project config, then env vars.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults.
    /// 2. `.fleetd/config.yaml` (project config).
    /// 3. `FLEETD_*` environment variables.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".fleetd/config.yaml"))
            .merge(Env::prefixed("FLEETD_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("FLEETD_").split("__"))
            .extract()
            .context(format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.limits.max_fleet == 0 || config.limits.max_fleet > 1000 {
            return Err(ConfigError::InvalidMaxFleet(config.limits.max_fleet));
        }
        if config.limits.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(config.limits.max_depth));
        }
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("default config should validate");
    }

    #[test]
    fn rejects_zero_max_fleet() {
        let mut config = Config::default();
        config.limits.max_fleet = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxFleet(0))
        ));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() {
        let yaml = "limits:\n  max_fleet: 20\nlogging:\n  level: debug\n";
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .unwrap();
        assert_eq!(config.limits.max_fleet, 20);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }
}
