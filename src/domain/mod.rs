//! Domain layer: entities, error taxonomy, and ports (interfaces).
//!
//! Pure domain code has no infrastructure concerns — no sqlx, no tokio
//! process spawning, no tracing. Everything here is framework-agnostic.

pub mod errors;
pub mod models;
pub mod ports;
