//! SSO fallback
//!
//! Per-identity state machine:
//!
//! ```text
//! anonymous ──begin_login──► session-pending ──complete_login──► authenticated
//!     ▲                                                              │
//!     └──────────────────────────── logout ──────────────────────────┘
//! ```
//!
//! Consulted only after the static roster and the directory both deny.

mod handshake;
mod provider;
mod session;

pub use handshake::{SsoError, SsoHandshake, SsoVerdict};
pub use provider::{IdentityProvider, OidcProvider, ProviderError};
pub use session::{generate_session_token, SessionStore};
