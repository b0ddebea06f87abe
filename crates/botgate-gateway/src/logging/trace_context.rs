//! Trace Context - decision correlation and structured logging

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info, info_span, Span};

/// Trace ids are 24-bit
const TRACE_ID_MASK: u32 = 0x00FF_FFFF;

/// Odd multiplier; scatters consecutive sequence numbers across the id space
const TRACE_ID_SCATTER: u32 = 0x9E37_79B1;

/// Decisions traced so far
static DECISION_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Random per-process offset so ids differ across restarts
static SEQUENCE_OFFSET: OnceLock<u32> = OnceLock::new();

/// Six hex characters for one sequence number. Any 2^24 consecutive
/// sequence numbers map to distinct ids.
fn trace_id_for(sequence: u32) -> String {
    format!("{:06x}", sequence.wrapping_mul(TRACE_ID_SCATTER) & TRACE_ID_MASK)
}

/// Short id correlating the log lines of one decision (e.g. "a1b2c3")
pub fn generate_trace_id() -> String {
    let offset = *SEQUENCE_OFFSET.get_or_init(rand::random::<u32>);
    trace_id_for(offset.wrapping_add(DECISION_SEQUENCE.fetch_add(1, Ordering::Relaxed)))
}

/// Correlation data for one authorization decision
#[derive(Debug, Clone)]
pub struct DecisionTrace {
    pub trace_id: String,
    pub identity: String,
    pub command_id: String,
    pub started_at: Instant,
}

impl DecisionTrace {
    pub fn new(identity: &str, command_id: &str) -> Self {
        Self {
            trace_id: generate_trace_id(),
            identity: identity.to_string(),
            command_id: command_id.to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Span that tags all child logs with the trace id
    pub fn span(&self) -> Span {
        info_span!(
            "decision",
            trace_id = %self.trace_id,
            identity = %self.identity,
            command = %self.command_id,
        )
    }

    /// Single consolidated line per decision. Denials are info (audit),
    /// allows are debug.
    pub fn log_exit(&self, allowed: bool, detail: &str) {
        let elapsed = self.elapsed_ms();
        if allowed {
            debug!(trace_id = %self.trace_id, "[Authz] allow {} ({}ms)", detail, elapsed);
        } else {
            info!(
                trace_id = %self.trace_id,
                identity = %self.identity,
                command = %self.command_id,
                "[Authz] deny {} ({}ms)",
                detail,
                elapsed
            );
        }
    }
}
