//! SQLite-backed brain with optional field encryption.
//!
//! One row per key. Values are stored as JSON text; with an encryptor the
//! text is sealed under its key and the row is flagged `encrypted`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use botgate_core::{Brain, RepoResult};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::crypto::FieldEncryptor;
use crate::Database;

pub struct SqliteBrain {
    db: Arc<Mutex<Database>>,
    encryptor: Option<Arc<FieldEncryptor>>,
}

impl SqliteBrain {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db, encryptor: None }
    }

    /// Encrypt values written from now on
    pub fn with_encryptor(mut self, encryptor: Arc<FieldEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    fn encode(&self, key: &str, value: &Value) -> Result<(String, bool)> {
        let json = serde_json::to_string(value).context("Failed to serialize brain value")?;
        match &self.encryptor {
            Some(encryptor) => Ok((
                encryptor
                    .encrypt(key, &json)
                    .with_context(|| format!("Failed to encrypt brain value '{}'", key))?,
                true,
            )),
            None => Ok((json, false)),
        }
    }

    fn decode(&self, key: &str, stored: String, encrypted: bool) -> Result<Value> {
        let json = if encrypted {
            let encryptor = self.encryptor.as_ref().with_context(|| {
                format!("Brain value '{}' is encrypted but no key is configured", key)
            })?;
            encryptor
                .decrypt(key, &stored)
                .with_context(|| format!("Failed to decrypt brain value '{}'", key))?
        } else {
            stored
        };

        serde_json::from_str(&json)
            .with_context(|| format!("Brain value '{}' is not valid JSON", key))
    }
}

#[async_trait]
impl Brain for SqliteBrain {
    async fn get(&self, key: &str) -> RepoResult<Option<Value>> {
        let row: Option<(String, bool)> = {
            let db = self.db.lock().await;
            db.connection()
                .query_row(
                    "SELECT value, encrypted FROM brain_entries WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
        };

        row.map(|(stored, encrypted)| self.decode(key, stored, encrypted))
            .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> RepoResult<()> {
        let (stored, encrypted) = self.encode(key, &value)?;

        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO brain_entries (key, value, encrypted, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                encrypted = excluded.encrypted,
                updated_at = excluded.updated_at",
            params![key, stored, encrypted],
        )?;

        debug!(key, encrypted, "[Brain] Stored value");
        Ok(())
    }
}
