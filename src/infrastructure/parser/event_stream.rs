//! Newline-delimited record parser for one worker's output stream.
//!
//! Grounded on the teacher's SSE parser (`infrastructure/claude/streaming.rs`:
//! line-oriented tokenizing of a structured wire format into a typed event),
//! adapted from `event:`/`data:` framing to single-JSON-object-per-line
//! framing.

use std::collections::VecDeque;

use serde::Deserialize;

use crate::domain::models::{HealthSignal, ParsedEvent, ParserState, MAX_RECENT_OUTPUT_LINES};

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    record_type: String,
    subtype: Option<String>,
    session_id: Option<String>,
    message: Option<RawMessage>,
    is_error: Option<bool>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Vec<RawContentBlock>,
}

#[derive(Deserialize)]
struct RawContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// Stateful, single-threaded parser for one worker. Lines are fed in input
/// order; emitted events preserve that order.
pub struct EventStreamParser {
    state: ParserState,
    session_id: Option<String>,
    error_count: u64,
    total_events: u64,
    last_event_at_ms: i64,
    ring: VecDeque<String>,
    partial_line: String,
}

impl EventStreamParser {
    pub fn new(now_ms: i64) -> Self {
        Self {
            state: ParserState::Idle,
            session_id: None,
            error_count: 0,
            total_events: 0,
            last_event_at_ms: now_ms,
            ring: VecDeque::with_capacity(MAX_RECENT_OUTPUT_LINES),
            partial_line: String::new(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parse one line. Plain text (not a recognized JSON record) yields
    /// `None` but is still appended to the output ring.
    pub fn parse_line(&mut self, line: &str, now_ms: i64) -> Option<ParsedEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Ok(raw) = serde_json::from_str::<RawRecord>(trimmed) else {
            self.push_ring(trimmed.to_string());
            return None;
        };

        self.total_events += 1;
        self.last_event_at_ms = now_ms;
        Some(self.interpret(raw))
    }

    /// Split a chunk on `\n`, parsing every complete line and retaining any
    /// trailing partial line for the next call.
    pub fn parse_batch(&mut self, chunk: &str, now_ms: i64) -> Vec<ParsedEvent> {
        let combined = format!("{}{chunk}", self.partial_line);
        let mut lines: Vec<&str> = combined.split('\n').collect();
        self.partial_line = if combined.ends_with('\n') {
            String::new()
        } else {
            lines.pop().unwrap_or_default().to_string()
        };

        lines
            .into_iter()
            .filter_map(|line| self.parse_line(line, now_ms))
            .collect()
    }

    pub fn get_health_signal(&self, now_ms: i64) -> HealthSignal {
        let ms_since_last_event = now_ms - self.last_event_at_ms;
        HealthSignal {
            state: self.state,
            ms_since_last_event,
            error_count: self.error_count,
            total_events: self.total_events,
            is_healthy: HealthSignal::compute_is_healthy(self.state, ms_since_last_event),
        }
    }

    /// Most-recent-last, capped at 1000 regardless of the requested limit.
    pub fn get_recent_output(&self, limit: usize) -> Vec<String> {
        let limit = limit.min(MAX_RECENT_OUTPUT_LINES);
        let skip = self.ring.len().saturating_sub(limit);
        self.ring.iter().skip(skip).cloned().collect()
    }

    fn interpret(&mut self, raw: RawRecord) -> ParsedEvent {
        match raw.record_type.as_str() {
            "system" if raw.subtype.as_deref() == Some("init") => {
                let session_id = raw.session_id.unwrap_or_default();
                self.session_id = Some(session_id.clone());
                self.state = ParserState::Ready;
                ParsedEvent::SystemInit { session_id }
            }
            "assistant" => {
                self.state = ParserState::Working;
                let text: Vec<String> = raw
                    .message
                    .map(|m| m.content)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|block| block.block_type == "text")
                    .filter_map(|block| block.text)
                    .collect();
                for block in &text {
                    self.push_ring(block.clone());
                }
                ParsedEvent::Assistant { text }
            }
            "result" => {
                let is_error = raw.subtype.as_deref() == Some("error") || raw.is_error.unwrap_or(false);
                if is_error {
                    self.error_count += 1;
                }
                ParsedEvent::Result { is_error }
            }
            other => {
                if raw.subtype.as_deref() == Some("error") {
                    self.error_count += 1;
                }
                ParsedEvent::Other {
                    event_type: other.to_string(),
                    subtype: raw.subtype,
                }
            }
        }
    }

    fn push_ring(&mut self, line: String) {
        if self.ring.len() >= MAX_RECENT_OUTPUT_LINES {
            self.ring.pop_front();
        }
        self.ring.push_back(line);
    }
}
