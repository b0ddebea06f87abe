//! Botgate Storage Layer
//!
//! Implementations of the `Brain` key-value contract.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │         Brain trait (botgate-core)           │
//! ├──────────────────────┬───────────────────────┤
//! │     MemoryBrain      │      SqliteBrain      │
//! │  (tests, ephemeral)  │ (FieldEncryptor opt.) │
//! ├──────────────────────┴───────────────────────┤
//! │              Database (SQLite)               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use botgate_storage::{Database, FieldEncryptor, SqliteBrain, parse_master_key};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let key = parse_master_key(&hex_key)?;
//! let brain = SqliteBrain::new(db).with_encryptor(Arc::new(FieldEncryptor::new(&key)?));
//! ```

mod brain;
pub mod crypto;
mod database;

pub use brain::{MemoryBrain, SqliteBrain};
pub use crypto::{generate_master_key, parse_master_key, FieldEncryptor, MasterKey, KEY_SIZE};
pub use database::Database;

/// Default database file name.
pub const DATABASE_FILE: &str = "botgate.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("botgate").join(DATABASE_FILE))
}
