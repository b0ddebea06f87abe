//! Authorization configuration
//!
//! Loaded once at startup from environment variables. Absent directory or
//! SSO settings are not errors: those subsystems degrade to no-ops.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Environment variable names.
pub mod vars {
    pub const POWER_USERS: &str = "BOTGATE_POWER_USERS";
    pub const READER_USERS: &str = "BOTGATE_READER_USERS";
    pub const AUTH_DISABLED: &str = "BOTGATE_AUTH_DISABLED";

    pub const LDAP_PROTOCOL: &str = "BOTGATE_LDAP_PROTOCOL";
    pub const LDAP_SERVER: &str = "BOTGATE_LDAP_SERVER";
    pub const LDAP_PORT: &str = "BOTGATE_LDAP_PORT";
    pub const LDAP_BIND_DN: &str = "BOTGATE_LDAP_BIND_DN";
    pub const LDAP_BIND_PASSWORD: &str = "BOTGATE_LDAP_BIND_PASSWORD";
    pub const LDAP_ORG_ROOT: &str = "BOTGATE_LDAP_ORG_ROOT";
    pub const LDAP_EMAIL_ATTRIBUTE: &str = "BOTGATE_LDAP_EMAIL_ATTRIBUTE";
    pub const LDAP_MEMBERSHIP_ATTRIBUTE: &str = "BOTGATE_LDAP_MEMBERSHIP_ATTRIBUTE";
    pub const LDAP_POWER_GROUPS: &str = "BOTGATE_LDAP_POWER_GROUPS";
    pub const LDAP_READER_GROUPS: &str = "BOTGATE_LDAP_READER_GROUPS";

    pub const SSO_ENABLED: &str = "BOTGATE_SSO_ENABLED";
    pub const BASE_URL: &str = "BOTGATE_BASE_URL";
    pub const SSO_SESSION_TTL_SECS: &str = "BOTGATE_SSO_SESSION_TTL_SECS";

    pub const OIDC_AUTHORIZATION_ENDPOINT: &str = "BOTGATE_OIDC_AUTHORIZATION_ENDPOINT";
    pub const OIDC_TOKEN_ENDPOINT: &str = "BOTGATE_OIDC_TOKEN_ENDPOINT";
    pub const OIDC_USERINFO_ENDPOINT: &str = "BOTGATE_OIDC_USERINFO_ENDPOINT";
    pub const OIDC_CLIENT_ID: &str = "BOTGATE_OIDC_CLIENT_ID";
    pub const OIDC_CLIENT_SECRET: &str = "BOTGATE_OIDC_CLIENT_SECRET";
    pub const OIDC_SCOPES: &str = "BOTGATE_OIDC_SCOPES";
    pub const OIDC_GROUPS_CLAIM: &str = "BOTGATE_OIDC_GROUPS_CLAIM";
}

const DEFAULT_LDAP_PROTOCOL: &str = "ldap";
const DEFAULT_EMAIL_ATTRIBUTE: &str = "mail";
const DEFAULT_MEMBERSHIP_ATTRIBUTE: &str = "uniqueMember";
const DEFAULT_OIDC_SCOPES: &str = "openid email profile";
const DEFAULT_GROUPS_CLAIM: &str = "groups";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{var} must be one of \"ldap\" or \"ldaps\", got {value:?}")]
    InvalidProtocol { var: &'static str, value: String },

    #[error("{0} is required when SSO is enabled")]
    MissingForSso(&'static str),

    #[error("{var} is required when {required_by} is set")]
    MissingDependent {
        var: &'static str,
        required_by: &'static str,
    },
}

/// Top-level authorization settings
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Static power-tier identities
    pub power_users: Vec<String>,
    /// Static reader-tier identities
    pub reader_users: Vec<String>,
    /// Bypass all checks (audit-logged per decision)
    pub authentication_disabled: bool,
    pub directory: DirectoryConfig,
    pub sso: SsoConfig,
}

/// Directory (LDAP) connection and search settings
#[derive(Clone)]
pub struct DirectoryConfig {
    /// `ldap` or `ldaps`
    pub protocol: String,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    /// Search root for user entries
    pub org_root: String,
    /// Attribute holding a user's email
    pub email_attribute: String,
    /// Group attribute listing member DNs
    pub membership_attribute: String,
    pub power_groups: Vec<String>,
    pub reader_groups: Vec<String>,
}

/// SSO fallback settings
#[derive(Debug, Clone, Default)]
pub struct SsoConfig {
    pub enabled: bool,
    /// Externally reachable base URL used for login and callback links
    pub base_url: Option<Url>,
    /// Unset means sessions never expire
    pub session_ttl: Option<Duration>,
    /// Identity-provider client; only the HTTP callback needs it
    pub provider: Option<OidcConfig>,
}

/// OpenID Connect client settings for the login redirect and code exchange
#[derive(Clone)]
pub struct OidcConfig {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub userinfo_endpoint: Option<Url>,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    /// Claim carrying the user's groups in the token or userinfo response
    pub groups_claim: String,
}

impl AuthConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map (useful for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(String::as_str);

        let protocol = get(vars::LDAP_PROTOCOL)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LDAP_PROTOCOL)
            .to_string();
        if protocol != "ldap" && protocol != "ldaps" {
            return Err(ConfigError::InvalidProtocol {
                var: vars::LDAP_PROTOCOL,
                value: protocol,
            });
        }

        let port = match non_empty(get(vars::LDAP_PORT)) {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
                var: vars::LDAP_PORT,
                value: raw.to_string(),
            })?),
            None => None,
        };

        let directory = DirectoryConfig {
            protocol,
            server: non_empty(get(vars::LDAP_SERVER)).map(String::from),
            port,
            bind_dn: non_empty(get(vars::LDAP_BIND_DN)).map(String::from),
            bind_password: non_empty(get(vars::LDAP_BIND_PASSWORD)).map(String::from),
            org_root: get(vars::LDAP_ORG_ROOT).unwrap_or_default().to_string(),
            email_attribute: non_empty(get(vars::LDAP_EMAIL_ATTRIBUTE))
                .unwrap_or(DEFAULT_EMAIL_ATTRIBUTE)
                .to_string(),
            membership_attribute: non_empty(get(vars::LDAP_MEMBERSHIP_ATTRIBUTE))
                .unwrap_or(DEFAULT_MEMBERSHIP_ATTRIBUTE)
                .to_string(),
            power_groups: parse_group_list(get(vars::LDAP_POWER_GROUPS)),
            reader_groups: parse_group_list(get(vars::LDAP_READER_GROUPS)),
        };

        let base_url = non_empty(get(vars::BASE_URL))
            .map(|raw| parse_url(vars::BASE_URL, raw))
            .transpose()?;

        let session_ttl = match non_empty(get(vars::SSO_SESSION_TTL_SECS)) {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    var: vars::SSO_SESSION_TTL_SECS,
                    value: raw.to_string(),
                }
            })?)),
            None => None,
        };

        let sso = SsoConfig {
            enabled: parse_flag(get(vars::SSO_ENABLED)),
            base_url,
            session_ttl,
            provider: OidcConfig::from_vars(vars)?,
        };
        if sso.enabled && sso.base_url.is_none() {
            return Err(ConfigError::MissingForSso(vars::BASE_URL));
        }

        let config = Self {
            power_users: parse_identity_list(get(vars::POWER_USERS)),
            reader_users: parse_identity_list(get(vars::READER_USERS)),
            authentication_disabled: parse_flag(get(vars::AUTH_DISABLED)),
            directory,
            sso,
        };

        debug!(
            power_users = config.power_users.len(),
            reader_users = config.reader_users.len(),
            directory = config.directory.is_configured(),
            sso = config.sso.is_configured(),
            "[Config] Authorization configuration loaded"
        );

        Ok(config)
    }
}

impl DirectoryConfig {
    /// True when every parameter needed for a bind is present
    pub fn is_configured(&self) -> bool {
        self.server.is_some()
            && self.port.is_some()
            && self.bind_dn.is_some()
            && self.bind_password.is_some()
    }

    /// Connection URL, e.g. `ldap://ldap.example.com:389`
    pub fn url(&self) -> Option<String> {
        match (&self.server, self.port) {
            (Some(server), Some(port)) => Some(format!("{}://{}:{}", self.protocol, server, port)),
            _ => None,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_LDAP_PROTOCOL.to_string(),
            server: None,
            port: None,
            bind_dn: None,
            bind_password: None,
            org_root: String::new(),
            email_attribute: DEFAULT_EMAIL_ATTRIBUTE.to_string(),
            membership_attribute: DEFAULT_MEMBERSHIP_ATTRIBUTE.to_string(),
            power_groups: Vec::new(),
            reader_groups: Vec::new(),
        }
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("protocol", &self.protocol)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "[REDACTED]"))
            .field("org_root", &self.org_root)
            .field("email_attribute", &self.email_attribute)
            .field("membership_attribute", &self.membership_attribute)
            .field("power_groups", &self.power_groups)
            .field("reader_groups", &self.reader_groups)
            .finish()
    }
}

impl OidcConfig {
    /// Returns `None` when no authorization endpoint is configured
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Option<Self>, ConfigError> {
        let get = |name: &str| non_empty(vars.get(name).map(String::as_str));

        let Some(authorization_endpoint) = get(vars::OIDC_AUTHORIZATION_ENDPOINT) else {
            return Ok(None);
        };
        let require = |var: &'static str| {
            get(var).ok_or(ConfigError::MissingDependent {
                var,
                required_by: vars::OIDC_AUTHORIZATION_ENDPOINT,
            })
        };

        let token_endpoint = require(vars::OIDC_TOKEN_ENDPOINT)?;
        let client_id = require(vars::OIDC_CLIENT_ID)?;

        Ok(Some(Self {
            authorization_endpoint: parse_url(
                vars::OIDC_AUTHORIZATION_ENDPOINT,
                authorization_endpoint,
            )?,
            token_endpoint: parse_url(vars::OIDC_TOKEN_ENDPOINT, token_endpoint)?,
            userinfo_endpoint: get(vars::OIDC_USERINFO_ENDPOINT)
                .map(|raw| parse_url(vars::OIDC_USERINFO_ENDPOINT, raw))
                .transpose()?,
            client_id: client_id.to_string(),
            client_secret: get(vars::OIDC_CLIENT_SECRET).map(String::from),
            scopes: get(vars::OIDC_SCOPES)
                .unwrap_or(DEFAULT_OIDC_SCOPES)
                .split_whitespace()
                .map(String::from)
                .collect(),
            groups_claim: get(vars::OIDC_GROUPS_CLAIM)
                .unwrap_or(DEFAULT_GROUPS_CLAIM)
                .to_string(),
        }))
    }
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("authorization_endpoint", &self.authorization_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("userinfo_endpoint", &self.userinfo_endpoint.as_ref().map(Url::as_str))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("groups_claim", &self.groups_claim)
            .finish()
    }
}

impl SsoConfig {
    /// SSO is consulted only when enabled with a base URL
    pub fn is_configured(&self) -> bool {
        self.enabled && self.base_url.is_some()
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { var, source })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

/// Comma-separated identities. The whole value is trimmed; items are kept
/// verbatim so matching stays exact. Empty items (`"a@x.com,"`) are dropped:
/// the empty string is the sentinel for a missing identity.
pub fn parse_identity_list(value: Option<&str>) -> Vec<String> {
    value
        .map(str::trim)
        .unwrap_or_default()
        .split(',')
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Semicolon-separated group DNs. An empty value is an empty list.
pub fn parse_group_list(value: Option<&str>) -> Vec<String> {
    match value {
        None | Some("") => Vec::new(),
        Some(list) => list.split(';').map(String::from).collect(),
    }
}
