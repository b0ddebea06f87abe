//! Authorization decision
//!
//! Resolves an identity to an access tier through three cascading sources:
//! the static roster, the directory group test, and finally the SSO
//! fallback. Power access always satisfies a reader-tier command.
//!
//! Reader and power access are both resolved for every gated command, so
//! each decision logs the full picture. A gated command from the empty
//! identity is denied before any source is consulted.
//!
//! Any error or panic during a decision is logged and turned into a denial.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use botgate_core::{AccessTier, AuthConfig, PolicyTables, StaticRoster, ADMIN_ROLE, READER_ROLE};
use futures::{join, FutureExt};
use tracing::{debug, error, info, warn, Instrument};

use crate::directory::DirectoryClient;
use crate::logging::DecisionTrace;
use crate::sso::{SsoError, SsoHandshake};

/// Verdict for one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { login_url: Option<String> },
}

impl Decision {
    pub fn deny() -> Self {
        Decision::Deny { login_url: None }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn login_url(&self) -> Option<&str> {
        match self {
            Decision::Deny { login_url } => login_url.as_deref(),
            Decision::Allow => None,
        }
    }
}

/// Caller identity, command and originating chat context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequest {
    pub identity: String,
    pub command_id: String,
    pub room: Option<String>,
    pub team: Option<String>,
}

impl AccessRequest {
    pub fn new(identity: impl Into<String>, command_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            command_id: command_id.into(),
            room: None,
            team: None,
        }
    }

    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn in_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }
}

/// Everything a decision needs, built once at startup and shared.
pub struct AuthorizationContext {
    authentication_disabled: bool,
    policy: PolicyTables,
    roster: StaticRoster,
    directory: Arc<DirectoryClient>,
    reader_groups: Vec<String>,
    power_groups: Vec<String>,
    sso: Option<Arc<SsoHandshake>>,
}

impl AuthorizationContext {
    /// Context with the built-in policy tables and no SSO fallback
    pub fn new(config: &AuthConfig, directory: Arc<DirectoryClient>) -> Self {
        Self {
            authentication_disabled: config.authentication_disabled,
            policy: PolicyTables::builtin(),
            roster: StaticRoster::new(config.reader_users.iter(), config.power_users.iter()),
            reader_groups: config.directory.reader_groups.clone(),
            power_groups: config.directory.power_groups.clone(),
            directory,
            sso: None,
        }
    }

    pub fn with_policy(mut self, policy: PolicyTables) -> Self {
        self.policy = policy;
        self
    }

    /// Enable the SSO fallback
    pub fn with_sso(mut self, sso: Arc<SsoHandshake>) -> Self {
        self.sso = Some(sso);
        self
    }

    pub fn policy(&self) -> &PolicyTables {
        &self.policy
    }

    pub fn directory(&self) -> &Arc<DirectoryClient> {
        &self.directory
    }

    pub fn sso(&self) -> Option<&Arc<SsoHandshake>> {
        self.sso.as_ref()
    }

    /// Decide without chat context
    pub async fn decide(&self, identity: &str, command_id: &str) -> Decision {
        self.decide_request(&AccessRequest::new(identity, command_id))
            .await
    }

    /// Decide for one command invocation. Never fails open.
    pub async fn decide_request(&self, request: &AccessRequest) -> Decision {
        let trace = DecisionTrace::new(&request.identity, &request.command_id);
        let span = trace.span();

        async {
            let outcome = AssertUnwindSafe(self.evaluate(request)).catch_unwind().await;

            let decision = match outcome {
                Ok(Ok(decision)) => decision,
                Ok(Err(e)) => {
                    error!(error = %e, "[Authz] Decision failed, denying");
                    Decision::deny()
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(panic = %message, "[Authz] Decision panicked, denying");
                    Decision::deny()
                }
            };

            let detail = match &decision {
                Decision::Allow => "",
                Decision::Deny { login_url: Some(_) } => "(login required)",
                Decision::Deny { login_url: None } => "(no access)",
            };
            trace.log_exit(decision.is_allowed(), detail);
            decision
        }
        .instrument(span)
        .await
    }

    async fn evaluate(&self, request: &AccessRequest) -> Result<Decision, SsoError> {
        let identity = request.identity.as_str();
        let command_id = request.command_id.as_str();

        if self.authentication_disabled {
            info!(identity, command = command_id, "[Authz] Authorization disabled, allowing");
            return Ok(Decision::Allow);
        }

        if command_id.is_empty() {
            warn!(identity, "[Authz] Missing command id, treating as unclassified");
        }

        let tier = self.policy.classify(command_id);
        debug!(%tier, "[Authz] Classified command");

        if tier == AccessTier::None {
            return Ok(Decision::Allow);
        }

        if identity.is_empty() {
            info!(command = command_id, "[Authz] Gated command without identity, denying");
            return Ok(Decision::deny());
        }

        let (reader, power) = join!(self.is_reader(identity), self.is_power(identity));
        debug!(reader, power, "[Authz] Resolved roster and directory access");

        match tier {
            AccessTier::Reader if reader || power => Ok(Decision::Allow),
            AccessTier::Reader => self.sso_fallback(request, READER_ROLE).await,
            AccessTier::Power if power => Ok(Decision::Allow),
            AccessTier::Power => self.sso_fallback(request, ADMIN_ROLE).await,
            AccessTier::None => Ok(Decision::Allow),
        }
    }

    async fn is_reader(&self, identity: &str) -> bool {
        self.roster.is_reader(identity)
            || (self.directory.is_available()
                && self
                    .directory
                    .is_member_of_any_group(identity, &self.reader_groups)
                    .await)
    }

    async fn is_power(&self, identity: &str) -> bool {
        self.roster.is_power(identity)
            || (self.directory.is_available()
                && self
                    .directory
                    .is_member_of_any_group(identity, &self.power_groups)
                    .await)
    }

    async fn sso_fallback(
        &self,
        request: &AccessRequest,
        required_role: &str,
    ) -> Result<Decision, SsoError> {
        let Some(sso) = &self.sso else {
            return Ok(Decision::deny());
        };

        let verdict = sso
            .check_access(
                &request.identity,
                required_role,
                request.room.as_deref(),
                request.team.as_deref(),
            )
            .await?;

        Ok(if verdict.authorized {
            Decision::Allow
        } else {
            Decision::Deny {
                login_url: verdict.login_url,
            }
        })
    }
}
