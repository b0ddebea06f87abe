//! Login session and identity-provider profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-time correlation between a session token and the chat context
/// that asked the user to log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    /// Identity (email) the login is for
    pub identity: String,
    /// Chat room the gated command came from
    pub room: Option<String>,
    /// Chat team/workspace the gated command came from
    pub team: Option<String>,
    /// When the session was issued
    pub created_at: DateTime<Utc>,
}

impl LoginSession {
    pub fn new(identity: impl Into<String>, room: Option<String>, team: Option<String>) -> Self {
        Self {
            identity: identity.into(),
            room,
            team,
            created_at: Utc::now(),
        }
    }

    /// Check whether the session is older than `ttl`. A TTL reaching past
    /// the representable date range never expires.
    pub fn is_expired(&self, ttl: chrono::Duration) -> bool {
        self.created_at
            .checked_add_signed(ttl)
            .is_some_and(|deadline| deadline <= Utc::now())
    }
}

/// What the identity provider returned for a completed login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl ProviderProfile {
    pub fn new<I, S>(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        groups: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            access_token: access_token.into(),
            refresh_token,
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}
