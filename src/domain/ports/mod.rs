//! Domain ports (interfaces) for the fleet orchestration kernel. The
//! kernel depends only on these traits; concrete adapters live under
//! `infrastructure`.

pub mod agent_launcher;
pub mod belief_repository;
pub mod bidding_repository;
pub mod blackboard_repository;
pub mod checkpoint_repository;
pub mod clock;
pub mod consensus_repository;
pub mod credit_repository;
pub mod git;
pub mod payoff_repository;
pub mod pheromone_repository;
pub mod spawn_queue_repository;
pub mod swarm_repository;
pub mod worker_repository;

pub use agent_launcher::{AgentLauncher, LaunchRequest, LaunchedProcess};
pub use belief_repository::BeliefRepository;
pub use bidding_repository::BiddingRepository;
pub use blackboard_repository::BlackboardRepository;
pub use checkpoint_repository::CheckpointRepository;
pub use clock::Clock;
pub use consensus_repository::ConsensusRepository;
pub use credit_repository::CreditRepository;
pub use git::GitPort;
pub use payoff_repository::PayoffRepository;
pub use pheromone_repository::PheromoneRepository;
pub use spawn_queue_repository::SpawnQueueRepository;
pub use swarm_repository::SwarmRepository;
pub use worker_repository::WorkerRepository;
