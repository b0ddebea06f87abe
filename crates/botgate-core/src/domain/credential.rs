//! Credential record - per-identity SSO state
//!
//! Stored in the brain under a single mapping keyed by identity.
//! Records are created empty on first lookup and never deleted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ADMIN_ROLE;

/// SSO tokens and group claims for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl CredentialRecord {
    /// An empty record (anonymous identity).
    pub fn empty() -> Self {
        Self::default()
    }

    /// True once an SSO login populated the access token.
    pub fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Store the tokens and groups returned by the identity provider.
    pub fn store_login(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        groups: BTreeSet<String>,
    ) {
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        self.groups = groups;
    }

    /// Clear tokens and groups (logout).
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.groups.clear();
    }

    /// `admin` satisfies every role; otherwise the exact role must be claimed.
    pub fn grants_role(&self, role: &str) -> bool {
        self.groups.contains(ADMIN_ROLE) || self.groups.contains(role)
    }
}
