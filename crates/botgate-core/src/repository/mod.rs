//! Repository traits for persisted state
//!
//! The brain is the host's key-value store. Only its get/set contract is
//! used here; implementations live in `botgate-storage` (or the host).

use async_trait::async_trait;
use serde_json::Value;

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Key-value store ("brain") holding JSON values.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> RepoResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> RepoResult<()>;
}
