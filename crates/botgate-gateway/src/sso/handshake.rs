//! SSO handshake - login sessions, callback handling and access checks

use std::sync::Arc;

use botgate_core::{AuthEvent, EventSender, LoginSession, ProviderProfile};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::{ProviderError, SessionStore};
use crate::credential_store::CredentialStore;

/// Path under the base URL that starts a login
pub const LOGIN_PATH: &str = "/sso/login";
/// Path under the base URL the identity provider redirects back to
pub const CALLBACK_PATH: &str = "/sso/callback";

#[derive(Debug, Error)]
pub enum SsoError {
    #[error("login session not found or expired")]
    SessionNotFound,

    #[error("identity provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("credential store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Result of an SSO access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoVerdict {
    pub authorized: bool,
    /// Set when the identity has no token and must log in
    pub login_url: Option<String>,
}

impl SsoVerdict {
    fn authorized() -> Self {
        Self {
            authorized: true,
            login_url: None,
        }
    }

    fn denied() -> Self {
        Self {
            authorized: false,
            login_url: None,
        }
    }

    fn login_required(login_url: String) -> Self {
        Self {
            authorized: false,
            login_url: Some(login_url),
        }
    }
}

pub struct SsoHandshake {
    base_url: String,
    sessions: SessionStore,
    credentials: Arc<CredentialStore>,
    events: EventSender,
}

impl SsoHandshake {
    pub fn new(
        base_url: &Url,
        sessions: SessionStore,
        credentials: Arc<CredentialStore>,
        events: EventSender,
    ) -> Self {
        Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            sessions,
            credentials,
            events,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Redirect URI registered with the identity provider
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.base_url, CALLBACK_PATH)
    }

    /// Issue a login session and return the URL that starts it
    pub fn begin_login(&self, identity: &str, room: Option<&str>, team: Option<&str>) -> String {
        let session = LoginSession::new(identity, room.map(String::from), team.map(String::from));
        let token = self.sessions.issue(session);
        info!(identity, "[SSO] Login required, session issued");
        format!("{}{}/{}", self.base_url, LOGIN_PATH, token)
    }

    /// Consume the session for `token` and store the provider's tokens and
    /// groups in the identity's credential record.
    ///
    /// An unknown token changes nothing. On success the originating chat
    /// context is signalled with [`AuthEvent::LoginCompleted`].
    pub async fn complete_login(
        &self,
        token: &str,
        profile: ProviderProfile,
    ) -> Result<LoginSession, SsoError> {
        let Some(session) = self.sessions.take(token) else {
            warn!("[SSO] Callback for unknown login session");
            return Err(SsoError::SessionNotFound);
        };

        let groups = profile.groups.len();
        self.credentials
            .store_login(&session.identity, profile)
            .await?;

        info!(
            identity = %session.identity,
            groups,
            "[SSO] Login completed"
        );

        self.events.emit(AuthEvent::LoginCompleted {
            identity: session.identity.clone(),
            room: session.room.clone(),
            team: session.team.clone(),
            completed_at: Utc::now(),
        });

        Ok(session)
    }

    /// Clear the identity's tokens and groups
    pub async fn logout(&self, identity: &str) -> Result<(), SsoError> {
        self.credentials.clear(identity).await?;
        info!(identity, "[SSO] Logged out");
        self.events.emit(AuthEvent::LoggedOut {
            identity: identity.to_string(),
        });
        Ok(())
    }

    /// Without a token the identity is sent to log in. With one, access
    /// requires an `admin` group claim or exactly `required_role`.
    pub async fn check_access(
        &self,
        identity: &str,
        required_role: &str,
        room: Option<&str>,
        team: Option<&str>,
    ) -> Result<SsoVerdict, SsoError> {
        let record = self.credentials.snapshot(identity).await?;

        if !record.has_token() {
            return Ok(SsoVerdict::login_required(self.begin_login(identity, room, team)));
        }

        let authorized = record.grants_role(required_role);
        debug!(identity, required_role, authorized, "[SSO] Checked group claims");

        Ok(if authorized {
            SsoVerdict::authorized()
        } else {
            SsoVerdict::denied()
        })
    }
}
