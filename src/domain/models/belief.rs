//! Belief domain model.

use serde::{Deserialize, Serialize};

/// A single agent's belief about a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Belief {
    pub id: String,
    pub swarm_id: String,
    pub agent_handle: String,
    pub subject: String,
    pub belief_type: String,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub updated_at: i64,
}

impl Belief {
    /// Confidence is clamped to `[0, 1]` at construction.
    pub fn new(
        id: String,
        swarm_id: String,
        agent_handle: String,
        subject: String,
        belief_type: String,
        value: serde_json::Value,
        confidence: f64,
        evidence: Vec<String>,
        updated_at: i64,
    ) -> Self {
        Self {
            id,
            swarm_id,
            agent_handle,
            subject,
            belief_type,
            value,
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
            updated_at,
        }
    }
}

/// Aggregate view across a swarm's beliefs about one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConsensus {
    pub subject: String,
    pub majority_value: Option<serde_json::Value>,
    pub participation_rate: f64,
    pub participant_count: usize,
    pub total_agents: usize,
}
