//! Blackboard message domain model.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of blackboard message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Status,
    Directive,
    Checkpoint,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Status => "status",
            Self::Directive => "directive",
            Self::Checkpoint => "checkpoint",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "request" => Some(Self::Request),
            "response" => Some(Self::Response),
            "status" => Some(Self::Status),
            "directive" => Some(Self::Directive),
            "checkpoint" => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Only `checkpoint` messages are inspected by the kernel itself for
    /// persistence routing.
    pub fn routes_to_checkpoint_store(&self) -> bool {
        matches!(self, Self::Checkpoint)
    }
}

use super::spawn_queue::Priority;

/// A message posted to a swarm's shared blackboard. `payload` is kept
/// opaque at the kernel boundary: callers serialize/deserialize it
/// themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackboardMessage {
    pub id: String,
    pub swarm_id: String,
    pub sender_handle: String,
    pub message_type: MessageType,
    pub target_handle: Option<String>,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub read_by: HashSet<String>,
    pub created_at: i64,
    pub archived_at: Option<i64>,
}

impl BlackboardMessage {
    pub fn new(
        id: String,
        swarm_id: String,
        sender_handle: String,
        message_type: MessageType,
        target_handle: Option<String>,
        priority: Priority,
        payload: serde_json::Value,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            swarm_id,
            sender_handle,
            message_type,
            target_handle,
            priority,
            payload,
            read_by: HashSet::new(),
            created_at,
            archived_at: None,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.target_handle.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Mark `handle` as having read this message. The read set is monotonic:
    /// once added, a handle is never removed.
    pub fn mark_read(&mut self, handle: &str) {
        self.read_by.insert(handle.to_string());
    }

    pub fn has_read(&self, handle: &str) -> bool {
        self.read_by.contains(handle)
    }
}

/// Filter criteria for listing blackboard messages.
#[derive(Debug, Clone, Default)]
pub struct BlackboardFilter {
    pub swarm_id: Option<String>,
    pub target_handle: Option<String>,
    pub message_type: Option<MessageType>,
    pub include_archived: bool,
}
