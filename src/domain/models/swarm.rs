//! Swarm domain model.

use serde::{Deserialize, Serialize};

/// A named grouping of workers sharing coordination and credit scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub max_agents: u32,
    pub created_at: i64,
}

impl Swarm {
    pub fn new(id: String, name: String, max_agents: u32, created_at: i64) -> Self {
        Self {
            id,
            name,
            description: None,
            max_agents,
            created_at,
        }
    }

    /// `true` if `current_live` workers already fill (or exceed) capacity.
    pub fn is_at_capacity(&self, current_live: u32) -> bool {
        current_live >= self.max_agents
    }
}
