//! Beliefs: per-agent claims about a subject, aggregated into a swarm-wide
//! consensus view.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::FleetResult;
use crate::domain::models::{Belief, SwarmConsensus};
use crate::domain::ports::{BeliefRepository, Clock};
use crate::services::push_hub::{Event, PushHub, Subject};

pub struct BeliefService<B, C>
where
    B: BeliefRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<B>,
    clock: Arc<C>,
    push_hub: PushHub,
}

impl<B, C> BeliefService<B, C>
where
    B: BeliefRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<B>, clock: Arc<C>, push_hub: PushHub) -> Self {
        Self { repo, clock, push_hub }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        swarm_id: String,
        agent_handle: String,
        subject: String,
        belief_type: String,
        value: serde_json::Value,
        confidence: f64,
        evidence: Vec<String>,
    ) -> FleetResult<Belief> {
        let now = self.clock.now_ms();
        let belief = Belief::new(
            Uuid::new_v4().to_string(),
            swarm_id.clone(),
            agent_handle,
            subject.clone(),
            belief_type,
            value,
            confidence,
            evidence,
            now,
        );
        self.repo.upsert(&belief).await?;
        self.push_hub
            .publish(Subject::Swarm(swarm_id.clone()), Event::BeliefUpdated { swarm_id, subject })
            .await;
        Ok(belief)
    }

    pub async fn list_for_agent(&self, swarm_id: &str, agent_handle: &str) -> FleetResult<Vec<Belief>> {
        self.repo.list_for_agent(swarm_id, agent_handle).await
    }

    /// Aggregate every belief about `subject` with `confidence >=
    /// min_confidence` into a majority value. Participation rate is the
    /// share of agents holding *any* opinion on the subject whose belief
    /// clears the confidence threshold.
    pub async fn get_swarm_consensus(&self, swarm_id: &str, subject: &str, min_confidence: f64) -> FleetResult<SwarmConsensus> {
        let all = self.repo.list_for_subject(swarm_id, subject).await?;
        let total_agents = all.len();
        let qualifying: Vec<&Belief> = all.iter().filter(|b| b.confidence >= min_confidence).collect();

        let mut counts: HashMap<String, u32> = HashMap::new();
        for belief in &qualifying {
            *counts.entry(belief.value.to_string()).or_insert(0) += 1;
        }
        let majority_key = counts.iter().max_by_key(|(_, count)| **count).map(|(k, _)| k.clone());
        let majority_value = majority_key
            .and_then(|k| qualifying.iter().find(|b| b.value.to_string() == k))
            .map(|b| b.value.clone());

        let participant_count = qualifying.len();
        let participation_rate = if total_agents == 0 { 0.0 } else { participant_count as f64 / total_agents as f64 };

        Ok(SwarmConsensus {
            subject: subject.to_string(),
            majority_value,
            participation_rate,
            participant_count,
            total_agents,
        })
    }
}
