//! Maps [`fleetd::domain::errors::FleetError`] onto HTTP responses. No
//! business logic lives here, only a status-code table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleetd::domain::errors::FleetError;
use serde_json::json;

pub struct ApiError(pub FleetError);

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FleetError::NotFound(_) => StatusCode::NOT_FOUND,
            FleetError::Conflict(_) => StatusCode::CONFLICT,
            FleetError::Forbidden(_) => StatusCode::FORBIDDEN,
            FleetError::InvariantViolation(_) | FleetError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FleetError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FleetError::SpawnFailed(_) => StatusCode::BAD_GATEWAY,
            FleetError::Storage(_) | FleetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": { "kind": self.0.kind(), "message": self.0.to_string() } }));
        (status, body).into_response()
    }
}
