//! SQLite connection for the brain.
//!
//! The schema version lives in `PRAGMA user_version`; every migration above
//! it is applied in order, each in its own transaction.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Schema steps, in order. `user_version` ends up at the length of this list.
const MIGRATIONS: &[(&str, &str)] = &[("initial", include_str!("migrations/001_initial.sql"))];

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the file at `path` (parent directories included) and
    /// bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create brain directory {:?}", dir))?;
        }

        let conn =
            Connection::open(path).with_context(|| format!("Failed to open brain at {:?}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!(?path, "[Brain] Database opened");

        Self::migrated(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(mut conn: Connection) -> Result<Self> {
        let applied = Self::read_version(&conn)?;

        for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied as usize) {
            let version = index as i64 + 1;
            info!(version, name, "[Brain] Applying migration");

            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .with_context(|| format!("Migration {} ({}) failed", version, name))?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
        }

        Ok(Self { conn })
    }

    fn read_version(conn: &Connection) -> Result<i64> {
        conn.query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("Failed to read schema version")
    }

    /// Number of migrations applied
    pub fn schema_version(&self) -> Result<i64> {
        Self::read_version(&self.conn)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
