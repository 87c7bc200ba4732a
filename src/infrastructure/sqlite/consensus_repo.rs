//! `SQLite` implementation of [`ConsensusRepository`].

use async_trait::async_trait;
use sqlx::error::DatabaseError;
use sqlx::{FromRow, SqlitePool};

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{Proposal, ProposalStatus, Vote};
use crate::domain::ports::ConsensusRepository;

#[derive(FromRow)]
struct ProposalRow {
    id: String,
    swarm_id: String,
    proposer_handle: String,
    title: String,
    options: String,
    status: String,
    deadline: Option<i64>,
    created_at: i64,
    closed_at: Option<i64>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = FleetError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "open" => ProposalStatus::Open,
            "closed" => ProposalStatus::Closed,
            other => return Err(FleetError::Internal(format!("unknown proposal status: {other}"))),
        };

        Ok(Proposal {
            id: row.id,
            swarm_id: row.swarm_id,
            proposer_handle: row.proposer_handle,
            title: row.title,
            options: serde_json::from_str(&row.options)?,
            status,
            deadline: row.deadline,
            created_at: row.created_at,
            closed_at: row.closed_at,
        })
    }
}

#[derive(FromRow)]
struct VoteRow {
    id: String,
    proposal_id: String,
    voter_handle: String,
    option: String,
    cast_at: i64,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            id: row.id,
            proposal_id: row.proposal_id,
            voter_handle: row.voter_handle,
            option: row.option,
            cast_at: row.cast_at,
        }
    }
}

fn status_as_str(status: ProposalStatus) -> &'static str {
    match status {
        ProposalStatus::Open => "open",
        ProposalStatus::Closed => "closed",
    }
}

pub struct SqliteConsensusRepository {
    pool: SqlitePool,
}

impl SqliteConsensusRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsensusRepository for SqliteConsensusRepository {
    async fn create_proposal(&self, proposal: &Proposal) -> FleetResult<()> {
        sqlx::query(
            "INSERT INTO proposals
                (id, swarm_id, proposer_handle, title, options, status, deadline, created_at, closed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&proposal.id)
        .bind(&proposal.swarm_id)
        .bind(&proposal.proposer_handle)
        .bind(&proposal.title)
        .bind(serde_json::to_string(&proposal.options)?)
        .bind(status_as_str(proposal.status))
        .bind(proposal.deadline)
        .bind(proposal.created_at)
        .bind(proposal.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_proposal(&self, id: &str) -> FleetResult<Option<Proposal>> {
        let row = sqlx::query_as::<_, ProposalRow>("SELECT * FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn update_proposal(&self, proposal: &Proposal) -> FleetResult<()> {
        sqlx::query("UPDATE proposals SET status = ?, closed_at = ? WHERE id = ?")
            .bind(status_as_str(proposal.status))
            .bind(proposal.closed_at)
            .bind(&proposal.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_open_proposals(&self, swarm_id: &str) -> FleetResult<Vec<Proposal>> {
        let rows = sqlx::query_as::<_, ProposalRow>(
            "SELECT * FROM proposals WHERE swarm_id = ? AND status = 'open' ORDER BY created_at ASC",
        )
        .bind(swarm_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Proposal::try_from).collect()
    }

    async fn cast_vote(&self, vote: &Vote) -> FleetResult<()> {
        let result = sqlx::query(
            "INSERT INTO votes (id, proposal_id, voter_handle, option, cast_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&vote.id)
        .bind(&vote.proposal_id)
        .bind(&vote.voter_handle)
        .bind(&vote.option)
        .bind(vote.cast_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(FleetError::Conflict(
                format!("{} already voted on {}", vote.voter_handle, vote.proposal_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_votes(&self, proposal_id: &str) -> FleetResult<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE proposal_id = ? ORDER BY cast_at ASC",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn has_voted(&self, proposal_id: &str, voter_handle: &str) -> FleetResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM votes WHERE proposal_id = ? AND voter_handle = ?",
        )
        .bind(proposal_id)
        .bind(voter_handle)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::DatabaseConnection;

    async fn repo() -> SqliteConsensusRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        sqlx::query("INSERT INTO swarms (id, name, max_agents, created_at) VALUES ('s', 'swarm', 5, 0)")
            .execute(db.pool())
            .await
            .unwrap();
        SqliteConsensusRepository::new(db.pool().clone())
    }

    fn proposal() -> Proposal {
        Proposal {
            id: "p1".into(),
            swarm_id: "s".into(),
            proposer_handle: "alpha".into(),
            title: "adopt trunk-based dev".into(),
            options: vec!["yes".into(), "no".into()],
            status: ProposalStatus::Open,
            deadline: None,
            created_at: 0,
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_vote_from_same_voter_is_rejected() {
        let repo = repo().await;
        repo.create_proposal(&proposal()).await.unwrap();

        let vote = Vote {
            id: "v1".into(),
            proposal_id: "p1".into(),
            voter_handle: "alpha".into(),
            option: "yes".into(),
            cast_at: 0,
        };
        repo.cast_vote(&vote).await.unwrap();

        let mut again = vote.clone();
        again.id = "v2".into();
        let err = repo.cast_vote(&again).await.unwrap_err();
        assert!(matches!(err, FleetError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_open_proposals_excludes_closed() {
        let repo = repo().await;
        repo.create_proposal(&proposal()).await.unwrap();
        let mut closed = proposal();
        closed.id = "p2".into();
        closed.status = ProposalStatus::Closed;
        repo.create_proposal(&closed).await.unwrap();

        let open = repo.list_open_proposals("s").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "p1");
    }
}
