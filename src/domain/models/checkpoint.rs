//! Checkpoint domain model.
//!
//! A checkpoint is a structured handoff snapshot between workers capturing
//! goal, progress, blockers, and next steps.

use serde::{Deserialize, Serialize};

/// Status of a checkpoint handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pending,
    Accepted,
    Rejected,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// File touch-set recorded in a checkpoint body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointFiles {
    pub created: Vec<String>,
    pub modified: Vec<String>,
}

/// Structured handoff content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointBody {
    pub goal: String,
    pub now: String,
    pub test: Option<String>,
    pub done_this_session: Vec<String>,
    pub blockers: Vec<String>,
    pub questions: Vec<String>,
    pub worked: Vec<String>,
    pub failed: Vec<String>,
    pub next: Vec<String>,
    pub files: CheckpointFiles,
}

/// A handoff checkpoint between two workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub from_handle: String,
    pub to_handle: String,
    pub body: CheckpointBody,
    pub status: CheckpointStatus,
    pub created_at: i64,
}

impl Checkpoint {
    pub fn new(
        id: String,
        from_handle: String,
        to_handle: String,
        body: CheckpointBody,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            from_handle,
            to_handle,
            body,
            status: CheckpointStatus::Pending,
            created_at,
        }
    }
}
