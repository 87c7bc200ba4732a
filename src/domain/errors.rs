//! Error taxonomy for the fleet orchestration kernel.
//!
//! Every operation surfaced to a caller returns exactly one [`FleetError`]
//! variant. The kernel never panics on well-formed input; malformed input is
//! the validator's responsibility (see the HTTP/CLI collaborators).

use thiserror::Error;

/// Kernel-wide error type. Each variant corresponds to one error kind in the
/// error taxonomy: `NotFound`, `Conflict`, `Forbidden`, `InvariantViolation`,
/// `InsufficientBalance`, `Timeout`, `SpawnFailed`, `Storage`, `Internal`.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: f64, requested: f64 },

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type returned by every kernel operation.
pub type FleetResult<T> = Result<T, FleetError>;

impl FleetError {
    /// Short machine-readable kind, for collaborators that need to map the
    /// error onto a transport-specific status (HTTP code, exit code, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Timeout(_) => "timeout",
            Self::SpawnFailed(_) => "spawn_failed",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error kind represents a transient storage failure that
    /// is safe to retry for idempotent reads.
    pub fn is_transient_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<sqlx::Error> for FleetError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {err}"))
    }
}

impl From<std::io::Error> for FleetError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("io error: {err}"))
    }
}
