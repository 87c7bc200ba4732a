//! Parsed event and health-signal types produced by the per-worker
//! event-stream parser.

use serde::{Deserialize, Serialize};

/// Lifecycle state the parser infers from the record stream for one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserState {
    Idle,
    Ready,
    Working,
}

/// A single structured record recognized on the wire, or a raw text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedEvent {
    SystemInit {
        session_id: String,
    },
    Assistant {
        text: Vec<String>,
    },
    Result {
        is_error: bool,
    },
    Other {
        event_type: String,
        subtype: Option<String>,
    },
}

/// Snapshot returned by `getHealthSignal`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthSignal {
    pub state: ParserState,
    pub ms_since_last_event: i64,
    pub error_count: u64,
    pub total_events: u64,
    pub is_healthy: bool,
}

/// Threshold below which a silent `working` parser is still healthy.
pub const HEALTHY_SILENCE_MS: i64 = 60_000;

impl HealthSignal {
    /// `isHealthy` is true when either the parser has been quiet under the
    /// threshold, or it isn't in `working` state (idle/ready workers are
    /// allowed to stay silent indefinitely).
    pub fn compute_is_healthy(state: ParserState, ms_since_last_event: i64) -> bool {
        ms_since_last_event < HEALTHY_SILENCE_MS || state != ParserState::Working
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_parser_unhealthy_after_silence_threshold() {
        assert!(HealthSignal::compute_is_healthy(ParserState::Working, 1_000));
        assert!(!HealthSignal::compute_is_healthy(ParserState::Working, 61_000));
    }

    #[test]
    fn idle_parser_stays_healthy_regardless_of_silence() {
        assert!(HealthSignal::compute_is_healthy(ParserState::Idle, 999_999));
        assert!(HealthSignal::compute_is_healthy(ParserState::Ready, 999_999));
    }
}
