//! # Botgate Core Library
//!
//! Domain types and rules for gating chat-bot commands.
//!
//! ## Modules
//!
//! - `config` - Authorization configuration loaded from the environment
//! - `domain` - Access tiers, policy tables, rosters, credential records, login sessions
//! - `repository` - The key-value `Brain` contract used for persisted state
//! - `event_bus` - Broadcast distribution of `AuthEvent`s to the host
//! - `messages` - User-facing reply texts

pub mod config;
pub mod domain;
pub mod event_bus;
pub mod messages;
pub mod repository;

// Re-export commonly used types
pub use config::{AuthConfig, ConfigError, DirectoryConfig, OidcConfig, SsoConfig};
pub use domain::*;
pub use repository::*;

pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
