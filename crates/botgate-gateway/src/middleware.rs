//! Middleware boundary between the chat host and the decision engine
//!
//! The host hands over each intercepted command; the outcome tells it to
//! keep dispatching or to stop and reply. Missing identity or command id
//! become the empty string, which classifies as unclassified.

use std::sync::Arc;

use botgate_core::{messages, AuthEvent, EventSender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::decision::{AccessRequest, AuthorizationContext, Decision};

/// An intercepted chat command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandRequest {
    pub identity: Option<String>,
    pub command_id: Option<String>,
    pub room: Option<String>,
    pub team: Option<String>,
}

impl CommandRequest {
    pub fn new(identity: impl Into<String>, command_id: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            command_id: Some(command_id.into()),
            ..Default::default()
        }
    }

    fn access_request(&self) -> AccessRequest {
        AccessRequest {
            identity: self.identity.clone().unwrap_or_default(),
            command_id: self.command_id.clone().unwrap_or_default(),
            room: self.room.clone(),
            team: self.team.clone(),
        }
    }
}

/// Request to run `target` on behalf of another flow (e.g. natural-language
/// matching), with the parameters it extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub identity: Option<String>,
    pub target: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

/// Serialized for the host API as `{"outcome": "continue"}` or
/// `{"outcome": "short_circuit", "public_reply": .., "private_reply": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MiddlewareOutcome {
    /// Keep dispatching the command
    Continue,
    /// Stop and reply. A login link, if any, goes in the private reply.
    ShortCircuit {
        public_reply: String,
        private_reply: Option<String>,
    },
}

impl MiddlewareOutcome {
    pub fn is_continue(&self) -> bool {
        matches!(self, MiddlewareOutcome::Continue)
    }

    fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::Allow => MiddlewareOutcome::Continue,
            Decision::Deny { login_url: Some(url) } => MiddlewareOutcome::ShortCircuit {
                public_reply: messages::LOGIN_REQUIRED.to_string(),
                private_reply: Some(messages::login_prompt(&url)),
            },
            Decision::Deny { login_url: None } => MiddlewareOutcome::ShortCircuit {
                public_reply: messages::NO_ACCESS.to_string(),
                private_reply: None,
            },
        }
    }
}

pub struct AuthorizationMiddleware {
    context: Arc<AuthorizationContext>,
    events: EventSender,
}

impl AuthorizationMiddleware {
    pub fn new(context: Arc<AuthorizationContext>, events: EventSender) -> Self {
        Self { context, events }
    }

    pub fn context(&self) -> &Arc<AuthorizationContext> {
        &self.context
    }

    /// Authorize an intercepted command
    pub async fn handle(&self, request: &CommandRequest) -> MiddlewareOutcome {
        let decision = self
            .context
            .decide_request(&request.access_request())
            .await;
        MiddlewareOutcome::from_decision(decision)
    }

    /// Authorize a forwarded command against its target id. On approval the
    /// host is told to dispatch `target` with the original parameters.
    pub async fn forward(&self, request: ForwardRequest) -> MiddlewareOutcome {
        let access = AccessRequest {
            identity: request.identity.clone().unwrap_or_default(),
            command_id: request.target.clone(),
            room: request.room.clone(),
            team: request.team.clone(),
        };

        let decision = self.context.decide_request(&access).await;
        if !decision.is_allowed() {
            debug!(forward_to = %request.target, "[Authz] Forward denied");
            return MiddlewareOutcome::from_decision(decision);
        }

        info!(
            identity = %access.identity,
            forward_to = %request.target,
            "[Authz] Forward approved"
        );
        self.events.emit(AuthEvent::ForwardApproved {
            identity: access.identity,
            target: request.target,
            parameters: request.parameters,
        });
        MiddlewareOutcome::Continue
    }
}
