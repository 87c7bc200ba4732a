//! Consensus: proposal/vote tallying with quorum checks.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{tally_votes, Proposal, ProposalStatus, TallyResult, Vote};
use crate::domain::ports::{Clock, ConsensusRepository};
use crate::services::push_hub::{Event, PushHub, Subject};

pub struct ConsensusService<R, C>
where
    R: ConsensusRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<R>,
    clock: Arc<C>,
    push_hub: PushHub,
}

impl<R, C> ConsensusService<R, C>
where
    R: ConsensusRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<R>, clock: Arc<C>, push_hub: PushHub) -> Self {
        Self { repo, clock, push_hub }
    }

    pub async fn create_proposal(
        &self,
        swarm_id: String,
        proposer_handle: String,
        title: String,
        options: Vec<String>,
        deadline: Option<i64>,
    ) -> FleetResult<Proposal> {
        if options.len() < 2 {
            return Err(FleetError::InvariantViolation("a proposal needs at least two options".to_string()));
        }
        let now = self.clock.now_ms();
        let proposal = Proposal {
            id: Uuid::new_v4().to_string(),
            swarm_id: swarm_id.clone(),
            proposer_handle,
            title,
            options,
            status: ProposalStatus::Open,
            deadline,
            created_at: now,
            closed_at: None,
        };
        self.repo.create_proposal(&proposal).await?;
        self.push_hub.publish(Subject::Swarm(swarm_id), Event::ConsensusProposal { proposal_id: proposal.id.clone() }).await;
        Ok(proposal)
    }

    pub async fn list_open_proposals(&self, swarm_id: &str) -> FleetResult<Vec<Proposal>> {
        self.repo.list_open_proposals(swarm_id).await
    }

    /// Casts one vote per `(proposal, voter)`; a second vote from the same
    /// voter is rejected with `Conflict` rather than overwriting the first.
    pub async fn cast_vote(&self, proposal_id: &str, voter_handle: &str, option: &str) -> FleetResult<Vote> {
        let proposal = self
            .repo
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("proposal {proposal_id}")))?;
        let now = self.clock.now_ms();
        if !proposal.is_open(now) {
            return Err(FleetError::Conflict(format!("proposal {proposal_id} is not open")));
        }
        if !proposal.options.iter().any(|o| o == option) {
            return Err(FleetError::InvariantViolation(format!("{option} is not a valid option for {proposal_id}")));
        }
        if self.repo.has_voted(proposal_id, voter_handle).await? {
            return Err(FleetError::Conflict(format!("{voter_handle} already voted on {proposal_id}")));
        }

        let vote = Vote { id: Uuid::new_v4().to_string(), proposal_id: proposal_id.to_string(), voter_handle: voter_handle.to_string(), option: option.to_string(), cast_at: now };
        self.repo.cast_vote(&vote).await?;
        self.push_hub
            .publish(Subject::Swarm(proposal.swarm_id.clone()), Event::ConsensusVote { proposal_id: proposal_id.to_string(), voter_handle: voter_handle.to_string() })
            .await;
        Ok(vote)
    }

    /// Closes an open proposal and tallies its votes against
    /// `eligible_voters` for quorum. Quorum is evaluated at `quorum_fraction`
    /// of eligible voters regardless of outcome; an unmet quorum still
    /// records a winner but `quorum_met` is `false`.
    pub async fn close_and_tally(&self, proposal_id: &str, eligible_voters: usize, quorum_fraction: f64) -> FleetResult<TallyResult> {
        let mut proposal = self
            .repo
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("proposal {proposal_id}")))?;
        if proposal.status == ProposalStatus::Closed {
            return Err(FleetError::Conflict(format!("proposal {proposal_id} already closed")));
        }

        let votes = self.repo.list_votes(proposal_id).await?;
        let result = tally_votes(&votes, eligible_voters, quorum_fraction);

        let now = self.clock.now_ms();
        proposal.status = ProposalStatus::Closed;
        proposal.closed_at = Some(now);
        self.repo.update_proposal(&proposal).await?;

        self.push_hub
            .publish(Subject::Swarm(proposal.swarm_id.clone()), Event::ConsensusResult { proposal_id: proposal_id.to_string(), passed: result.quorum_met })
            .await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeConsensusRepo {
        proposals: Mutex<Vec<Proposal>>,
        votes: Mutex<Vec<Vote>>,
    }

    #[async_trait]
    impl ConsensusRepository for FakeConsensusRepo {
        async fn create_proposal(&self, proposal: &Proposal) -> FleetResult<()> {
            self.proposals.lock().unwrap().push(proposal.clone());
            Ok(())
        }
        async fn get_proposal(&self, id: &str) -> FleetResult<Option<Proposal>> {
            Ok(self.proposals.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }
        async fn update_proposal(&self, proposal: &Proposal) -> FleetResult<()> {
            let mut guard = self.proposals.lock().unwrap();
            if let Some(existing) = guard.iter_mut().find(|p| p.id == proposal.id) {
                *existing = proposal.clone();
            }
            Ok(())
        }
        async fn list_open_proposals(&self, swarm_id: &str) -> FleetResult<Vec<Proposal>> {
            Ok(self
                .proposals
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.swarm_id == swarm_id && p.status == ProposalStatus::Open)
                .cloned()
                .collect())
        }
        async fn cast_vote(&self, vote: &Vote) -> FleetResult<()> {
            self.votes.lock().unwrap().push(vote.clone());
            Ok(())
        }
        async fn list_votes(&self, proposal_id: &str) -> FleetResult<Vec<Vote>> {
            Ok(self.votes.lock().unwrap().iter().filter(|v| v.proposal_id == proposal_id).cloned().collect())
        }
        async fn has_voted(&self, proposal_id: &str, voter_handle: &str) -> FleetResult<bool> {
            Ok(self.votes.lock().unwrap().iter().any(|v| v.proposal_id == proposal_id && v.voter_handle == voter_handle))
        }
    }

    #[tokio::test]
    async fn duplicate_vote_is_rejected() {
        let repo = Arc::new(FakeConsensusRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = ConsensusService::new(repo, clock, PushHub::default());

        let proposal = service.create_proposal("s1".into(), "alice".into(), "pick color".into(), vec!["red".into(), "blue".into()], None).await.unwrap();
        service.cast_vote(&proposal.id, "bob", "red").await.unwrap();
        let err = service.cast_vote(&proposal.id, "bob", "blue").await.unwrap_err();
        assert!(matches!(err, FleetError::Conflict(_)));
    }

    #[tokio::test]
    async fn quorum_unmet_still_records_winner() {
        let repo = Arc::new(FakeConsensusRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = ConsensusService::new(repo, clock, PushHub::default());

        let proposal = service.create_proposal("s1".into(), "alice".into(), "pick color".into(), vec!["red".into(), "blue".into()], None).await.unwrap();
        service.cast_vote(&proposal.id, "bob", "red").await.unwrap();

        let result = service.close_and_tally(&proposal.id, 10, 0.5).await.unwrap();
        assert_eq!(result.winner, Some("red".to_string()));
        assert!(!result.quorum_met);
    }
}
