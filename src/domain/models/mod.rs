//! Domain entities and value objects. Pure data and behavior; no I/O, no
//! storage, no process management.

pub mod belief;
pub mod bidding;
pub mod blackboard;
pub mod checkpoint;
pub mod consensus;
pub mod credit;
pub mod event;
pub mod payoff;
pub mod pheromone;
pub mod spawn_queue;
pub mod swarm;
pub mod worker;

pub use belief::{Belief, SwarmConsensus};
pub use bidding::{
    award_first_price, award_second_price, evaluate_bids, AuctionAward, BidStatus, BidWeights,
    ScoredBid, TaskBid,
};
pub use blackboard::{BlackboardFilter, BlackboardMessage, MessageType};
pub use checkpoint::{Checkpoint, CheckpointBody, CheckpointFiles, CheckpointStatus};
pub use consensus::{tally_votes, Proposal, ProposalStatus, TallyResult, Vote};
pub use credit::{CreditAccount, CreditTransaction, LeaderboardEntry, LeaderboardOrder, TransactionKind};
pub use event::{HealthSignal, ParsedEvent, ParserState, HEALTHY_SILENCE_MS};
pub use payoff::{calculate_payout, PayoffDefinition, PENALTY_TYPE};
pub use pheromone::{DecayResult, PheromoneFilter, PheromoneTrail, ResourceActivity};
pub use spawn_queue::{
    Priority, SpawnPayload, SpawnQueueFilter, SpawnQueueItem, SpawnStatus,
};
pub use swarm::Swarm;
pub use worker::{
    FleetStatus, Health, Role, SpawnMode, Worker, WorkerFilter, WorkerState,
    DEFAULT_MAX_DEPTH, MAX_RECENT_OUTPUT_LINES,
};
