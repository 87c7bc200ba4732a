//! `SQLite` implementations of every domain repository port.

mod belief_repo;
mod bidding_repo;
mod blackboard_repo;
mod checkpoint_repo;
mod consensus_repo;
mod credit_repo;
mod payoff_repo;
mod pheromone_repo;
mod spawn_queue_repo;
mod swarm_repo;
mod worker_repo;

pub use belief_repo::SqliteBeliefRepository;
pub use bidding_repo::SqliteBiddingRepository;
pub use blackboard_repo::SqliteBlackboardRepository;
pub use checkpoint_repo::SqliteCheckpointRepository;
pub use consensus_repo::SqliteConsensusRepository;
pub use credit_repo::SqliteCreditRepository;
pub use payoff_repo::SqlitePayoffRepository;
pub use pheromone_repo::SqlitePheromoneRepository;
pub use spawn_queue_repo::SqliteSpawnQueueRepository;
pub use swarm_repo::SqliteSwarmRepository;
pub use worker_repo::SqliteWorkerRepository;
