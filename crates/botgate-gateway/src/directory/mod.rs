//! Directory (LDAP) client
//!
//! Owns one directory connection for the process lifetime. Resolves a
//! user's distinguished name by email and tests group membership.
//!
//! Connection lifecycle:
//!
//! ```text
//! Uninitialized ──connect()──► Connecting ──bind ok──► Connected
//!       │                           └──bind error──► Failed (terminal)
//!       └── parameters missing ──► Disabled
//! ```
//!
//! `Disabled` is the degraded mode: the directory counts as available but
//! every membership test is negative without a search. `Failed` makes every
//! directory-backed check negative. There is no reconnect.

mod ldap;

pub use ldap::LdapConnector;

use async_trait::async_trait;
use botgate_core::DirectoryConfig;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Directory client errors
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("directory parameters are not configured")]
    NotConfigured,

    #[error("directory is not connected (state: {0})")]
    NotConnected(ConnectionState),

    #[error("failed to connect to directory: {0}")]
    Connect(String),

    #[error("directory bind failed: {0}")]
    Bind(String),

    #[error("directory search failed: {0}")]
    Search(String),
}

/// Lifecycle of the single directory connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Failed,
    /// No directory configured; searches are skipped
    Disabled,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
            ConnectionState::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound directory session able to run sub-tree searches.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    /// Sub-tree search under `base`; returns the DNs of matching entries in
    /// the order the server sent them.
    async fn search(&self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError>;
}

/// Opens and binds a directory session.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Arc<dyn DirectorySearch>, DirectoryError>;
}

struct Connection {
    state: ConnectionState,
    session: Option<Arc<dyn DirectorySearch>>,
}

/// Shared directory client, safe for concurrent callers.
pub struct DirectoryClient {
    config: DirectoryConfig,
    connection: RwLock<Connection>,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(Connection {
                state: ConnectionState::Uninitialized,
                session: None,
            }),
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.read().state
    }

    /// True when directory-backed checks should be attempted
    /// (`Connected`, or the `Disabled` degraded mode).
    pub fn is_available(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Disabled
        )
    }

    /// Bind using the configured parameters.
    ///
    /// Only the first call does anything; later calls return the current state.
    pub async fn connect(&self, connector: &dyn DirectoryConnector) -> ConnectionState {
        {
            let mut connection = self.connection.write();
            if connection.state != ConnectionState::Uninitialized {
                return connection.state;
            }

            if !self.config.is_configured() {
                info!("[Directory] No directory configured, membership checks disabled");
                connection.state = ConnectionState::Disabled;
                return connection.state;
            }

            connection.state = ConnectionState::Connecting;
        }

        info!(
            url = self.config.url().as_deref().unwrap_or_default(),
            "[Directory] Connecting"
        );

        let result = connector.connect(&self.config).await;

        let mut connection = self.connection.write();
        match result {
            Ok(session) => {
                info!("[Directory] Bound to directory");
                connection.session = Some(session);
                connection.state = ConnectionState::Connected;
            }
            Err(e) => {
                error!(error = %e, "[Directory] Connection failed, directory checks disabled");
                connection.state = ConnectionState::Failed;
            }
        }
        connection.state
    }

    fn session(&self) -> Result<Arc<dyn DirectorySearch>, DirectoryError> {
        let connection = self.connection.read();
        connection
            .session
            .clone()
            .ok_or(DirectoryError::NotConnected(connection.state))
    }

    /// Resolve the DN of the user entry whose email attribute equals `email`.
    ///
    /// The first matching entry wins. A search failure is an error, not a
    /// not-found.
    pub async fn find_distinguished_name(
        &self,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let session = self.session()?;
        let filter = equality_filter(&self.config.email_attribute, email);

        let dn = session
            .search(&self.config.org_root, &filter)
            .await?
            .into_iter()
            .next();

        debug!(email, found = dn.is_some(), "[Directory] DN lookup");
        Ok(dn)
    }

    async fn check_membership(&self, email: &str, group_dn: &str) -> Result<bool, DirectoryError> {
        let Some(dn) = self.find_distinguished_name(email).await? else {
            return Ok(false);
        };

        let filter = equality_filter(&self.config.membership_attribute, &dn);
        let matches = self.session()?.search(group_dn, &filter).await?;
        Ok(!matches.is_empty())
    }

    /// Whether `email` is listed in `group_dn`. Errors are logged and count
    /// as "not a member".
    pub async fn is_member_of_group(&self, email: &str, group_dn: &str) -> bool {
        match self.check_membership(email, group_dn).await {
            Ok(member) => member,
            Err(DirectoryError::NotConnected(state)) => {
                debug!(email, group_dn, %state, "[Directory] Skipping membership check");
                false
            }
            Err(e) => {
                error!(email, group_dn, error = %e, "[Directory] Membership check failed");
                false
            }
        }
    }

    /// Test every group concurrently and wait for all; true if any matched.
    pub async fn is_member_of_any_group(&self, email: &str, group_dns: &[String]) -> bool {
        if group_dns.is_empty() {
            return false;
        }

        let results = join_all(
            group_dns
                .iter()
                .map(|group| self.is_member_of_group(email, group)),
        )
        .await;

        let member = results.into_iter().any(|m| m);
        debug!(email, groups = group_dns.len(), member, "[Directory] Group fan-out");
        member
    }
}

fn equality_filter(attribute: &str, value: &str) -> String {
    format!("({}={})", attribute, ldap3::ldap_escape(value))
}
