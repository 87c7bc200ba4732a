//! Kernel services: the orchestration logic built on top of the domain
//! ports. Each module is generic over the ports it needs rather than over
//! a single god-object, so tests can wire in-memory fakes per service.

pub mod compound_driver;
pub mod coordination;
pub mod push_hub;
pub mod spawn_queue;
pub mod swarm_intelligence;
pub mod worker_supervisor;
