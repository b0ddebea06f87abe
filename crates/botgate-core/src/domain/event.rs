//! Authorization events delivered to the chat host
//!
//! The host subscribes to these to re-dispatch approved commands and to
//! return users to the chat context after an SSO login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// SSO callback stored credentials for `identity`
    LoginCompleted {
        identity: String,
        room: Option<String>,
        team: Option<String>,
        completed_at: DateTime<Utc>,
    },

    /// Credentials were cleared
    LoggedOut { identity: String },

    /// A forwarded command was approved and should be dispatched to `target`
    ForwardApproved {
        identity: String,
        target: String,
        parameters: serde_json::Value,
    },
}

impl AuthEvent {
    /// Get the event type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            AuthEvent::LoginCompleted { .. } => "login_completed",
            AuthEvent::LoggedOut { .. } => "logged_out",
            AuthEvent::ForwardApproved { .. } => "forward_approved",
        }
    }

    /// Identity the event concerns
    pub fn identity(&self) -> &str {
        match self {
            AuthEvent::LoginCompleted { identity, .. }
            | AuthEvent::LoggedOut { identity }
            | AuthEvent::ForwardApproved { identity, .. } => identity,
        }
    }
}
