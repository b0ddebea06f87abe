//! Mock implementations of the directory, brain and identity provider seams

use async_trait::async_trait;
use botgate_core::{Brain, DirectoryConfig, ProviderProfile, RepoResult};
use botgate_gateway::{
    DirectoryConnector, DirectoryError, DirectorySearch, IdentityProvider, ProviderError,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Scripted Directory
// ============================================================================

#[derive(Default)]
struct DirectoryData {
    /// email -> DN
    users: HashMap<String, String>,
    /// group DN -> member DNs
    groups: HashMap<String, HashSet<String>>,
    /// group DNs whose searches fail
    failing_groups: HashSet<String>,
    /// search bases that panic
    panicking_bases: HashSet<String>,
    bind_error: Option<String>,
}

/// In-memory directory that answers `(attr=value)` filters the way the
/// client builds them. Acts as both connector and bound session.
#[derive(Clone, Default)]
pub struct ScriptedDirectory {
    data: Arc<RwLock<DirectoryData>>,
    searches: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user entry with the DN from `fixtures::user_dn`
    pub fn with_user(self, email: &str) -> Self {
        self.data
            .write()
            .users
            .insert(email.to_string(), crate::fixtures::user_dn(email));
        self
    }

    /// Register `email` (and its user entry) as a member of `group_dn`
    pub fn with_member(self, group_dn: &str, email: &str) -> Self {
        let dn = crate::fixtures::user_dn(email);
        {
            let mut data = self.data.write();
            data.users.insert(email.to_string(), dn.clone());
            data.groups.entry(group_dn.to_string()).or_default().insert(dn);
        }
        self
    }

    pub fn with_failing_group(self, group_dn: &str) -> Self {
        self.data.write().failing_groups.insert(group_dn.to_string());
        self
    }

    pub fn with_panicking_base(self, base: &str) -> Self {
        self.data.write().panicking_bases.insert(base.to_string());
        self
    }

    pub fn with_bind_error(self, message: &str) -> Self {
        self.data.write().bind_error = Some(message.to_string());
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

fn parse_filter(filter: &str) -> Option<(&str, &str)> {
    filter
        .strip_prefix('(')
        .and_then(|f| f.strip_suffix(')'))
        .and_then(|f| f.split_once('='))
}

#[async_trait]
impl DirectorySearch for ScriptedDirectory {
    async fn search(&self, base: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent fan-out actually interleaves
        tokio::task::yield_now().await;

        let data = self.data.read();
        if data.panicking_bases.contains(base) {
            panic!("scripted directory panic for {}", base);
        }
        if data.failing_groups.contains(base) {
            return Err(DirectoryError::Search(format!("no such object: {}", base)));
        }

        let Some((attribute, value)) = parse_filter(filter) else {
            return Err(DirectoryError::Search(format!("bad filter: {}", filter)));
        };

        if let Some(members) = data.groups.get(base) {
            return Ok(if members.contains(value) {
                vec![base.to_string()]
            } else {
                Vec::new()
            });
        }

        if attribute == "mail" {
            return Ok(data.users.get(value).cloned().into_iter().collect());
        }

        Ok(Vec::new())
    }
}

#[async_trait]
impl DirectoryConnector for ScriptedDirectory {
    async fn connect(
        &self,
        _config: &DirectoryConfig,
    ) -> Result<Arc<dyn DirectorySearch>, DirectoryError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.data.read().bind_error.clone() {
            return Err(DirectoryError::Bind(message));
        }
        Ok(Arc::new(self.clone()))
    }
}

// ============================================================================
// Brains
// ============================================================================

/// Brain whose writes (and optionally reads) fail
#[derive(Default)]
pub struct FailingBrain {
    fail_reads: bool,
}

impl FailingBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        Self { fail_reads: true }
    }
}

#[async_trait]
impl Brain for FailingBrain {
    async fn get(&self, _key: &str) -> RepoResult<Option<Value>> {
        if self.fail_reads {
            anyhow::bail!("brain unavailable");
        }
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value) -> RepoResult<()> {
        anyhow::bail!("brain is read-only")
    }
}

// ============================================================================
// Identity Provider
// ============================================================================

/// Identity provider that hands out scripted profiles per code and records
/// every exchange.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    profiles: Arc<RwLock<HashMap<String, ProviderProfile>>>,
    exchanges: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(self, code: &str, profile: ProviderProfile) -> Self {
        self.profiles.write().insert(code.to_string(), profile);
        self
    }

    /// (code, redirect_uri) pairs seen so far
    pub fn exchanges(&self) -> Vec<(String, String)> {
        self.exchanges.read().clone()
    }
}

#[async_trait]
impl IdentityProvider for RecordingProvider {
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "https://idp.test/authorize?state={}&redirect_uri={}",
            state, redirect_uri
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        self.exchanges
            .write()
            .push((code.to_string(), redirect_uri.to_string()));

        self.profiles
            .read()
            .get(code)
            .cloned()
            .ok_or_else(|| ProviderError::Authorization("invalid_grant".to_string()))
    }
}
