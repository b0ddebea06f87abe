//! Botgate Gateway
//!
//! Command authorization engine that provides:
//! - Directory (LDAP) group-membership lookups
//! - Credential records persisted in the host's brain
//! - SSO login handshake used as a last-resort fallback
//! - The authorization decision and the middleware boundary around it
//! - The gateway HTTP API for the chat host and the SSO redirect and callback

pub mod credential_store;
pub mod decision;
pub mod directory;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod sso;

pub use credential_store::{CredentialStore, SharedCredential, CREDENTIALS_KEY};
pub use decision::{AccessRequest, AuthorizationContext, Decision};
pub use directory::{
    ConnectionState, DirectoryClient, DirectoryConnector, DirectoryError, DirectorySearch,
    LdapConnector,
};
pub use middleware::{AuthorizationMiddleware, CommandRequest, ForwardRequest, MiddlewareOutcome};
pub use server::{
    build_router, GatewayServer, GatewayServerConfig, HostState, HostToken, LogoutRequest, SsoState,
};
pub use sso::{
    IdentityProvider, OidcProvider, ProviderError, SessionStore, SsoError, SsoHandshake, SsoVerdict,
};
