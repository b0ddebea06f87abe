//! ldap3 transport for the directory client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use botgate_core::DirectoryConfig;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use super::{DirectoryConnector, DirectoryError, DirectorySearch};

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default per-operation timeout
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Request no attributes; only entry DNs are used.
const NO_ATTRIBUTES: &str = "1.1";

/// Connects to an LDAP server and performs a simple bind.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl LdapConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            operation_timeout: OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, operation: Duration) -> Self {
        self.connect_timeout = connect;
        self.operation_timeout = operation;
        self
    }
}

impl Default for LdapConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Arc<dyn DirectorySearch>, DirectoryError> {
        let url = config.url().ok_or(DirectoryError::NotConfigured)?;
        let (Some(bind_dn), Some(bind_password)) = (&config.bind_dn, &config.bind_password) else {
            return Err(DirectoryError::NotConfigured);
        };

        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "[Directory] Connection closed");
            }
        });

        ldap.with_timeout(self.operation_timeout)
            .simple_bind(bind_dn, bind_password)
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Bind(e.to_string()))?;

        debug!(bind_dn = %bind_dn, "[Directory] Simple bind succeeded");

        Ok(Arc::new(LdapSession {
            ldap,
            operation_timeout: self.operation_timeout,
        }))
    }
}

/// A bound connection. `Ldap` handles are cheap clones multiplexed over
/// one socket, so concurrent searches each take their own clone.
struct LdapSession {
    ldap: Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl DirectorySearch for LdapSession {
    async fn search(&self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        let mut ldap = self.ldap.clone();
        let (entries, _result) = ldap
            .with_timeout(self.operation_timeout)
            .search(base, Scope::Subtree, filter, vec![NO_ATTRIBUTES])
            .await
            .and_then(|result| result.success())
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }
}
