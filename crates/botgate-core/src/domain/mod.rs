//! Domain entities, value objects, and events
//!
//! This module contains all domain-level types for Botgate:
//! - Policy (AccessTier, PolicyTables) and the StaticRoster
//! - Persisted state (CredentialRecord) and ephemeral LoginSession
//! - Domain Events (AuthEvent, consumed by the chat host)

mod credential;
mod event;
mod policy;
mod roster;
mod session;

pub use credential::*;
pub use event::AuthEvent;
pub use policy::{AccessTier, PolicyTables, BUILTIN_POWER_COMMANDS, BUILTIN_READER_COMMANDS};
pub use roster::StaticRoster;
pub use session::*;

/// Role string a Credential Record group claim must carry to satisfy any tier.
pub const ADMIN_ROLE: &str = "admin";

/// Role string requested from the SSO fallback for reader-tier commands.
pub const READER_ROLE: &str = "reader";
