//! Consensus (proposal/vote) repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{Proposal, Vote};

#[async_trait]
pub trait ConsensusRepository: Send + Sync {
    async fn create_proposal(&self, proposal: &Proposal) -> FleetResult<()>;

    async fn get_proposal(&self, id: &str) -> FleetResult<Option<Proposal>>;

    async fn update_proposal(&self, proposal: &Proposal) -> FleetResult<()>;

    async fn list_open_proposals(&self, swarm_id: &str) -> FleetResult<Vec<Proposal>>;

    /// Rejects a duplicate vote from the same `voter_handle` by returning
    /// `Conflict` rather than inserting a second row.
    async fn cast_vote(&self, vote: &Vote) -> FleetResult<()>;

    async fn list_votes(&self, proposal_id: &str) -> FleetResult<Vec<Vote>>;

    async fn has_voted(&self, proposal_id: &str, voter_handle: &str) -> FleetResult<bool>;
}
