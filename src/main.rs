//! Fleetd CLI: loads configuration, opens the database, and either serves
//! the daemon (background tasks + per-worker reader loops) or issues a
//! single administrative command against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};

use fleetd::domain::models::{Role, SpawnMode, WorkerFilter};
use fleetd::infrastructure::config::ConfigLoader;
use fleetd::infrastructure::database::DatabaseConnection;
use fleetd::infrastructure::logging::init_tracing;
use fleetd::services::worker_supervisor::SpawnRequest;
use fleetd::{FleetKernel, PheromoneDecayConfig};

#[derive(Parser)]
#[command(name = "fleetd", about = "Fleet orchestration kernel", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground: background tasks stay up until
    /// interrupted.
    Serve,
    /// Spawn a new worker.
    Spawn {
        handle: String,
        #[arg(long, default_value = "worker")]
        role: String,
        #[arg(long, default_value = "default")]
        team: String,
        #[arg(long, default_value = ".")]
        working_dir: String,
        #[arg(long, default_value = "process")]
        spawn_mode: String,
    },
    /// Dismiss a live worker.
    Dismiss { handle: String },
    /// List workers, optionally filtered by role.
    Workers {
        #[arg(long)]
        role: Option<String>,
    },
    /// Print the aggregate fleet status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging, None).context("failed to initialize logging")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&database_url).await.context("failed to connect to database")?;
    db.migrate().await.context("failed to run database migrations")?;

    let kernel = FleetKernel::new(db.pool().clone(), &config);

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => {
            tracing::info!("fleetd starting");
            let tasks = kernel.spawn_background_tasks(
                config.limits.health_tick_ms,
                config.limits.poll_interval_ms,
                Some(PheromoneDecayConfig::default()),
            );
            tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            tracing::info!("fleetd shutting down");
            tasks.shutdown().await;
        }
        Commands::Spawn { handle, role, team, working_dir, spawn_mode } => {
            let role = Role::from_str(&role).ok_or_else(|| anyhow::anyhow!("invalid role: {role}"))?;
            let spawn_mode = SpawnMode::from_str(&spawn_mode).ok_or_else(|| anyhow::anyhow!("invalid spawn mode: {spawn_mode}"))?;
            let worker = kernel
                .supervisor
                .spawn(SpawnRequest {
                    handle,
                    role,
                    team_name: team,
                    working_dir,
                    initial_prompt: None,
                    session_id: None,
                    swarm_id: None,
                    spawn_mode,
                    depth_level: 0,
                    caller_role: Role::Coordinator,
                })
                .await?;
            println!("spawned {} ({})", worker.handle, worker.id);
        }
        Commands::Dismiss { handle } => {
            let dismissed = kernel.supervisor.dismiss(&handle, Role::Coordinator).await?;
            println!("dismissed {handle}: {dismissed}");
        }
        Commands::Workers { role } => {
            let role = match role {
                Some(r) => Some(Role::from_str(&r).ok_or_else(|| anyhow::anyhow!("invalid role: {r}"))?),
                None => None,
            };
            let filter = WorkerFilter { state: None, role, swarm_id: None };
            let workers = kernel.supervisor.list_workers(filter).await?;

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["handle", "role", "state", "health", "team", "depth"]);
            for w in workers {
                table.add_row(vec![
                    w.handle,
                    w.role.as_str().to_string(),
                    w.state.as_str().to_string(),
                    w.health.as_str().to_string(),
                    w.team_name,
                    w.depth_level.to_string(),
                ]);
            }
            println!("{table}");
        }
        Commands::Status => {
            let status = kernel.supervisor.get_status().await?;
            println!("total workers: {}", status.total);
            println!("uptime: {}ms", status.uptime_ms);
            println!("restarts (total / last hour): {} / {}", status.restarts_total, status.restarts_last_hour);
            for (state, count) in &status.by_state {
                println!("  state {state}: {count}");
            }
        }
    }

    db.close().await;
    Ok(())
}
