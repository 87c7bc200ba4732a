//! Thin HTTP/websocket collaborator in front of the fleetd kernel. Routing
//! and request validation only; every handler is a one-line call into a
//! kernel operation (see `routes.rs`).

mod error;
mod routes;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use fleetd::infrastructure::config::ConfigLoader;
use fleetd::infrastructure::database::DatabaseConnection;
use fleetd::infrastructure::logging::init_tracing;
use fleetd::FleetKernel;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "fleetd-gateway", about = "HTTP/websocket front end for fleetd")]
struct Args {
    #[arg(long, env = "FLEETD_GATEWAY_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging, None).context("failed to initialize logging")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&database_url).await.context("failed to connect to database")?;
    db.migrate().await.context("failed to run database migrations")?;

    let kernel = Arc::new(FleetKernel::new(db.pool().clone(), &config));
    let tasks = kernel.spawn_background_tasks(config.limits.health_tick_ms, config.limits.poll_interval_ms, None);

    let app = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/workers", get(routes::list_workers).post(routes::spawn_worker))
        .route("/workers/{handle}", get(routes::get_worker).delete(routes::dismiss_worker))
        .route("/status", get(routes::get_status))
        .route("/ws", get(ws::ws_handler))
        .with_state(kernel)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %args.addr, "fleetd-gateway listening");
    let listener = tokio::net::TcpListener::bind(args.addr).await.context("failed to bind gateway address")?;
    axum::serve(listener, app).await.context("gateway server error")?;

    tasks.shutdown().await;
    db.close().await;
    Ok(())
}
