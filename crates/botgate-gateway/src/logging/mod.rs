//! Decision logging
//!
//! Each authorization decision runs inside a span carrying a short trace
//! id, so every directory/SSO log line it causes can be correlated.

mod trace_context;

pub use trace_context::{generate_trace_id, DecisionTrace};
