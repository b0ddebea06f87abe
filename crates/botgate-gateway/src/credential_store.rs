//! Credential Store - per-identity SSO records kept in the brain
//!
//! All records live in one mapping stored under [`CREDENTIALS_KEY`]. The
//! mapping is read from the brain once per process and written back after
//! every mutation.
//!
//! Handles returned by [`CredentialStore::get_or_create`] are shared: a
//! mutation made through one handle is visible to every other holder.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use botgate_core::{Brain, CredentialRecord, ProviderProfile, RepoResult};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Brain key holding the identity → record mapping.
pub const CREDENTIALS_KEY: &str = "botgate.credentials";

/// Shared handle to one identity's record.
pub type SharedCredential = Arc<RwLock<CredentialRecord>>;

pub struct CredentialStore {
    brain: Arc<dyn Brain>,
    records: OnceCell<DashMap<String, SharedCredential>>,
    /// Serializes snapshot + write so the last writer persists the newest state
    persist_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(brain: Arc<dyn Brain>) -> Self {
        Self {
            brain,
            records: OnceCell::new(),
            persist_lock: Mutex::new(()),
        }
    }

    async fn records(&self) -> RepoResult<&DashMap<String, SharedCredential>> {
        self.records
            .get_or_try_init(|| async {
                let stored = self
                    .brain
                    .get(CREDENTIALS_KEY)
                    .await
                    .context("Failed to read credential mapping")?;

                let records: BTreeMap<String, CredentialRecord> = match stored {
                    Some(value) => serde_json::from_value(value)
                        .context("Stored credential mapping is malformed")?,
                    None => {
                        info!("[Brain] Creating credential mapping");
                        self.brain
                            .set(CREDENTIALS_KEY, serde_json::json!({}))
                            .await
                            .context("Failed to create credential mapping")?;
                        BTreeMap::new()
                    }
                };

                debug!(count = records.len(), "[Brain] Loaded credential records");

                Ok(records
                    .into_iter()
                    .map(|(identity, record)| (identity, Arc::new(RwLock::new(record))))
                    .collect())
            })
            .await
    }

    /// Look up the record for `identity`, creating an empty one on first access.
    pub async fn get_or_create(&self, identity: &str) -> RepoResult<SharedCredential> {
        let records = self.records().await?;

        if let Some(existing) = records.get(identity) {
            return Ok(existing.value().clone());
        }

        let mut created = false;
        let record = records
            .entry(identity.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(RwLock::new(CredentialRecord::empty()))
            })
            .value()
            .clone();

        if created {
            debug!(identity, "[Brain] Created empty credential record");
            self.persist().await?;
        }

        Ok(record)
    }

    /// Copy of the current record for `identity` (created if absent).
    pub async fn snapshot(&self, identity: &str) -> RepoResult<CredentialRecord> {
        let record = self.get_or_create(identity).await?;
        let snapshot = record.read().clone();
        Ok(snapshot)
    }

    /// Store the tokens and groups of a completed login.
    pub async fn store_login(&self, identity: &str, profile: ProviderProfile) -> RepoResult<()> {
        let record = self.get_or_create(identity).await?;
        record
            .write()
            .store_login(profile.access_token, profile.refresh_token, profile.groups);
        self.persist().await
    }

    /// Clear tokens and groups (logout). The record itself is kept.
    pub async fn clear(&self, identity: &str) -> RepoResult<()> {
        let record = self.get_or_create(identity).await?;
        record.write().clear();
        self.persist().await
    }

    /// Number of known identities
    pub async fn len(&self) -> RepoResult<usize> {
        Ok(self.records().await?.len())
    }

    async fn persist(&self) -> RepoResult<()> {
        let _guard = self.persist_lock.lock().await;
        let records = self.records().await?;

        let snapshot: BTreeMap<String, CredentialRecord> = records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().read().clone()))
            .collect();

        let value = serde_json::to_value(&snapshot).context("Failed to serialize credentials")?;
        self.brain
            .set(CREDENTIALS_KEY, value)
            .await
            .context("Failed to persist credential mapping")
    }
}
