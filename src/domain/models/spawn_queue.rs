//! Spawn queue item domain model.

use serde::{Deserialize, Serialize};

/// Relative urgency of a spawn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Status of a spawn queue item.
///
/// `Blocked` is derived (`blocked_by_count > 0`), never persisted as a
/// distinct row state transition target — see
/// [`SpawnQueueItem::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStatus {
    Pending,
    Approved,
    Rejected,
    Spawned,
    Cancelled,
    Blocked,
}

impl SpawnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Spawned => "spawned",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "spawned" => Some(Self::Spawned),
            "cancelled" => Some(Self::Cancelled),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Valid forward transitions:
    /// `pending → {approved → spawned, rejected, cancelled}`.
    pub fn can_transition_to(&self, next: SpawnStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Cancelled)
                | (Self::Approved, Self::Spawned)
                | (Self::Approved, Self::Rejected)
        )
    }
}

/// Payload carried by a spawn request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnPayload {
    pub task: String,
    pub context: Option<String>,
    pub checkpoint: Option<String>,
}

/// A request, from an existing worker, to spawn a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnQueueItem {
    pub id: String,
    pub requester_handle: String,
    pub target_agent_type: String,
    pub depth_level: u32,
    pub priority: Priority,
    pub status: SpawnStatus,
    pub depends_on: Vec<String>,
    pub blocked_by_count: u32,
    pub payload: SpawnPayload,
    pub created_at: i64,
    pub processed_at: Option<i64>,
    pub spawned_worker_id: Option<String>,
}

impl SpawnQueueItem {
    pub fn new(
        id: String,
        requester_handle: String,
        target_agent_type: String,
        depth_level: u32,
        priority: Priority,
        depends_on: Vec<String>,
        payload: SpawnPayload,
        created_at: i64,
    ) -> Self {
        let blocked_by_count = depends_on.len() as u32;
        Self {
            id,
            requester_handle,
            target_agent_type,
            depth_level,
            priority,
            status: SpawnStatus::Pending,
            depends_on,
            blocked_by_count,
            payload,
            created_at,
            processed_at: None,
            spawned_worker_id: None,
        }
    }

    /// The status a reader should see: `blocked` overrides `pending` when
    /// dependencies remain outstanding. Blocked is derived, never stored.
    pub fn effective_status(&self) -> SpawnStatus {
        if self.status == SpawnStatus::Pending && self.blocked_by_count > 0 {
            SpawnStatus::Blocked
        } else {
            self.status
        }
    }

    /// An item is ready to schedule once all dependencies have spawned.
    pub fn is_ready(&self) -> bool {
        self.status == SpawnStatus::Pending && self.blocked_by_count == 0
    }

    /// Scheduler ordering key: `(priority desc, created_at asc)`.
    pub fn schedule_key(&self) -> (std::cmp::Reverse<Priority>, i64) {
        (std::cmp::Reverse(self.priority), self.created_at)
    }
}

/// Filter criteria for listing spawn queue items.
#[derive(Debug, Clone, Default)]
pub struct SpawnQueueFilter {
    pub status: Option<SpawnStatus>,
    pub requester_handle: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(priority: Priority, created_at: i64) -> SpawnQueueItem {
        SpawnQueueItem::new(
            format!("item-{created_at}"),
            "coord".into(),
            "worker".into(),
            1,
            priority,
            vec![],
            SpawnPayload::default(),
            created_at,
        )
    }

    #[test]
    fn scheduler_orders_by_priority_then_age() {
        let mut items = vec![
            item(Priority::Low, 1),
            item(Priority::Critical, 5),
            item(Priority::Normal, 2),
            item(Priority::Critical, 2),
        ];
        items.sort_by_key(SpawnQueueItem::schedule_key);
        // Both critical items sort before normal/low; among the two
        // criticals, the older (created_at=2) comes first.
        assert_eq!(items[0].priority, Priority::Critical);
        assert_eq!(items[0].created_at, 2);
        assert_eq!(items[1].priority, Priority::Critical);
        assert_eq!(items[1].created_at, 5);
        assert_eq!(items[2].priority, Priority::Normal);
        assert_eq!(items[3].priority, Priority::Low);
    }

    #[test]
    fn blocked_is_derived_not_stored() {
        let mut it = item(Priority::Normal, 1);
        it.depends_on = vec!["other".into()];
        it.blocked_by_count = 1;
        assert_eq!(it.effective_status(), SpawnStatus::Blocked);
        it.blocked_by_count = 0;
        assert_eq!(it.effective_status(), SpawnStatus::Pending);
    }

    #[test]
    fn status_transitions_follow_allowed_edges() {
        assert!(SpawnStatus::Pending.can_transition_to(SpawnStatus::Approved));
        assert!(SpawnStatus::Approved.can_transition_to(SpawnStatus::Spawned));
        assert!(!SpawnStatus::Spawned.can_transition_to(SpawnStatus::Pending));
        assert!(!SpawnStatus::Rejected.can_transition_to(SpawnStatus::Approved));
    }
}
