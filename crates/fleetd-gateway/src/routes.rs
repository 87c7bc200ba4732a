//! Route handlers: each is a one-line call into a kernel operation
//! followed by a status-code mapping of its `FleetError`. No validation or
//! orchestration logic beyond what `serde` and the kernel already do.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use fleetd::domain::models::{Role, SpawnMode, WorkerFilter};
use fleetd::services::worker_supervisor::SpawnRequest;
use fleetd::FleetKernel;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub type AppState = Arc<FleetKernel>;

#[derive(Debug, Deserialize)]
pub struct SpawnWorkerBody {
    pub handle: String,
    pub role: String,
    pub team_name: String,
    pub working_dir: String,
    #[serde(default)]
    pub initial_prompt: Option<String>,
    #[serde(default)]
    pub swarm_id: Option<String>,
    #[serde(default = "default_spawn_mode")]
    pub spawn_mode: String,
    #[serde(default)]
    pub depth_level: u32,
}

fn default_spawn_mode() -> String {
    "process".to_string()
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (axum::http::StatusCode::BAD_REQUEST, Json(ErrorBody { message: message.into() })).into_response()
}

pub async fn spawn_worker(State(kernel): State<AppState>, Json(body): Json<SpawnWorkerBody>) -> axum::response::Response {
    let Some(role) = Role::from_str(&body.role) else {
        return bad_request(format!("invalid role: {}", body.role));
    };
    let Some(spawn_mode) = SpawnMode::from_str(&body.spawn_mode) else {
        return bad_request(format!("invalid spawn_mode: {}", body.spawn_mode));
    };

    let result = kernel
        .supervisor
        .spawn(SpawnRequest {
            handle: body.handle,
            role,
            team_name: body.team_name,
            working_dir: body.working_dir,
            initial_prompt: body.initial_prompt,
            session_id: None,
            swarm_id: body.swarm_id,
            spawn_mode,
            depth_level: body.depth_level,
            caller_role: Role::Coordinator,
        })
        .await;

    match result {
        Ok(worker) => Json(worker).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn dismiss_worker(State(kernel): State<AppState>, Path(handle): Path<String>) -> axum::response::Response {
    match kernel.supervisor.dismiss(&handle, Role::Coordinator).await {
        Ok(dismissed) => Json(serde_json::json!({ "dismissed": dismissed })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListWorkersQuery {
    pub role: Option<String>,
    pub swarm_id: Option<String>,
}

pub async fn list_workers(State(kernel): State<AppState>, Query(query): Query<ListWorkersQuery>) -> axum::response::Response {
    let role = match query.role {
        Some(r) => match Role::from_str(&r) {
            Some(role) => Some(role),
            None => return bad_request(format!("invalid role: {r}")),
        },
        None => None,
    };
    let filter = WorkerFilter { state: None, role, swarm_id: query.swarm_id };
    match kernel.supervisor.list_workers(filter).await {
        Ok(workers) => Json(workers).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn get_worker(State(kernel): State<AppState>, Path(handle): Path<String>) -> axum::response::Response {
    match kernel.supervisor.get_worker(&handle).await {
        Ok(Some(worker)) => Json(worker).into_response(),
        Ok(None) => axum::http::StatusCode::NOT_FOUND.into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn get_status(State(kernel): State<AppState>) -> axum::response::Response {
    match kernel.supervisor.get_status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
