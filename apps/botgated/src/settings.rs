//! Daemon host settings: listen address, host API token, brain database and
//! its encryption key

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use botgate_storage::{default_database_path, parse_master_key, MasterKey};

pub const LISTEN_ADDR: &str = "BOTGATE_LISTEN_ADDR";
pub const DATABASE_PATH: &str = "BOTGATE_DATABASE_PATH";
pub const BRAIN_KEY: &str = "BOTGATE_BRAIN_KEY";
pub const HOST_TOKEN: &str = "BOTGATE_HOST_TOKEN";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

pub struct HostSettings {
    pub listen_addr: SocketAddr,
    /// Bearer token the chat host must present on the host API
    pub host_token: Option<String>,
    pub database_path: PathBuf,
    /// Enables encryption of brain values at rest
    pub brain_key: Option<MasterKey>,
}

impl HostSettings {
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let listen_addr = get(LISTEN_ADDR)
            .unwrap_or(DEFAULT_LISTEN_ADDR)
            .parse::<SocketAddr>()
            .with_context(|| format!("{} is not a valid socket address", LISTEN_ADDR))?;

        let host_token = get(HOST_TOKEN).map(String::from);

        let database_path = match get(DATABASE_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_database_path().with_context(|| {
                format!("No data directory on this platform; set {}", DATABASE_PATH)
            })?,
        };

        let brain_key = get(BRAIN_KEY)
            .map(parse_master_key)
            .transpose()
            .with_context(|| format!("{} is invalid", BRAIN_KEY))?;

        Ok(Self {
            listen_addr,
            host_token,
            database_path,
            brain_key,
        })
    }
}
