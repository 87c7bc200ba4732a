//! Swarm-intelligence services — component G. Each submodule is a thin,
//! deterministic wrapper over one repository port, grounded on the
//! teacher's `services/circuit_breaker.rs` / `services/guardrails.rs`
//! shape (small stateless services wrapping a repository, publishing
//! through the shared event channel) since the teacher has no direct
//! pheromone/bidding/consensus equivalent of its own.

pub mod beliefs;
pub mod bidding;
pub mod consensus;
pub mod credits;
pub mod payoffs;
pub mod pheromones;

pub use beliefs::BeliefService;
pub use bidding::BiddingService;
pub use consensus::ConsensusService;
pub use credits::CreditsService;
pub use payoffs::PayoffsService;
pub use pheromones::PheromoneService;
