use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::infrastructure::config::LoggingConfig;

/// Initialize the global `tracing` subscriber. Returns a guard that must be
/// held for the process lifetime when `log_dir` is set, or log lines are
/// lost on exit.
pub fn init_tracing(config: &LoggingConfig, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let guard = if let Some(log_dir) = log_dir {
        let file_appender = rolling::daily(log_dir, "fleetd.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(env_filter.clone());

        let stdout_layer = stdout_layer(&config.format, env_filter);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stdout_layer)
            .init();

        Some(guard)
    } else {
        let stdout_layer = stdout_layer(&config.format, env_filter);
        tracing_subscriber::registry().with(stdout_layer).init();
        None
    };

    tracing::info!(level = %config.level, format = %config.format, "logging initialized");
    Ok(guard)
}

fn stdout_layer<S>(
    format: &str,
    env_filter: EnvFilter,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if format == "pretty" {
        Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stdout)
                .with_target(true)
                .with_filter(env_filter),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_target(true)
                .with_filter(env_filter),
        )
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!("invalid log level: {other}"),
    }
}
