//! One-time login sessions keyed by random token

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use botgate_core::LoginSession;
use dashmap::DashMap;
use rand::RngCore;
use std::time::Duration;
use tracing::debug;

/// Generate an unguessable, URL-safe session token (256 bits)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Pending login sessions. Without a TTL, unconsumed sessions stay until
/// the process exits.
pub struct SessionStore {
    sessions: DashMap<String, LoginSession>,
    ttl: Option<chrono::Duration>,
}

impl SessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()),
        }
    }

    /// Store `session` under a fresh token and return the token
    pub fn issue(&self, session: LoginSession) -> String {
        self.prune_expired();

        let token = generate_session_token();
        debug!(identity = %session.identity, "[SSO] Issued login session");
        self.sessions.insert(token.clone(), session);
        token
    }

    fn is_live(&self, session: &LoginSession) -> bool {
        self.ttl.map_or(true, |ttl| !session.is_expired(ttl))
    }

    /// Look up a live session without consuming it
    pub fn get(&self, token: &str) -> Option<LoginSession> {
        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .filter(|session| self.is_live(session))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    /// Remove and return the session. Expired sessions are removed but
    /// reported as absent.
    pub fn take(&self, token: &str) -> Option<LoginSession> {
        self.sessions
            .remove(token)
            .map(|(_, session)| session)
            .filter(|session| self.is_live(session))
    }

    /// Drop expired sessions; returns how many were removed
    pub fn prune_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };

        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "[SSO] Pruned expired login sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
