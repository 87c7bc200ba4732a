//! Structured logging: `tracing` subscriber initialization plus a
//! JSON-lines audit trail for security-relevant transitions.

mod audit;
mod init;

pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditOutcome};
pub use init::init_tracing;
