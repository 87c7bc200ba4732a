//! Consensus (proposal/vote) domain models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub swarm_id: String,
    pub proposer_handle: String,
    pub title: String,
    pub options: Vec<String>,
    pub status: ProposalStatus,
    pub deadline: Option<i64>,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

impl Proposal {
    pub fn is_expired(&self, now: i64) -> bool {
        self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    pub fn is_open(&self, now: i64) -> bool {
        self.status == ProposalStatus::Open && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub proposal_id: String,
    pub voter_handle: String,
    pub option: String,
    pub cast_at: i64,
}

/// Result of `closeAndTally`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyResult {
    pub winner: Option<String>,
    pub tally: HashMap<String, u32>,
    pub quorum_met: bool,
    pub participation_rate: f64,
}

/// Pure tally function: counts votes per option, breaks ties
/// lexicographically, and checks quorum against `eligible_voters`.
pub fn tally_votes(
    votes: &[Vote],
    eligible_voters: usize,
    quorum_fraction: f64,
) -> TallyResult {
    let mut tally: HashMap<String, u32> = HashMap::new();
    for v in votes {
        *tally.entry(v.option.clone()).or_insert(0) += 1;
    }

    let winner = tally
        .iter()
        .max_by(|(opt_a, count_a), (opt_b, count_b)| {
            count_a.cmp(count_b).then_with(|| opt_b.cmp(opt_a))
        })
        .map(|(opt, _)| opt.clone());

    let participation_rate = if eligible_voters == 0 {
        0.0
    } else {
        votes.len() as f64 / eligible_voters as f64
    };

    TallyResult {
        winner,
        tally,
        quorum_met: participation_rate >= quorum_fraction,
        participation_rate,
    }
}
