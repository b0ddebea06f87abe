//! Identity provider (OpenID Connect) client
//!
//! Builds the authorization redirect and exchanges the callback code for
//! tokens and group claims.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use botgate_core::{OidcConfig, ProviderProfile};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange failed: HTTP {status} - {body}")]
    TokenExchange { status: u16, body: String },

    #[error("userinfo request failed: HTTP {status}")]
    UserInfo { status: u16 },

    #[error("authorization server returned an error: {0}")]
    Authorization(String),
}

/// Opaque identity-provider exchange used by the SSO callback.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to redirect the browser to, carrying `state` for correlation
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String;

    /// Exchange an authorization code for tokens and group claims
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderProfile, ProviderError>;
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Remaining fields; the groups claim may be among them
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

pub struct OidcProvider {
    config: OidcConfig,
    http: reqwest::Client,
}

impl OidcProvider {
    pub fn new(config: OidcConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: OidcConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &Url,
        access_token: &str,
    ) -> Result<HashMap<String, Value>, ProviderError> {
        let response = self
            .http
            .get(endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UserInfo {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        let mut url = self.config.authorization_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", redirect_uri);
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", state);
        }
        url.to_string()
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        info!("[SSO] Exchanging authorization code for tokens");

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(self.config.token_endpoint.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::TokenExchange { status, body });
        }

        let token: TokenResponse = response.json().await?;

        let claims = match &self.config.userinfo_endpoint {
            Some(endpoint) => self.fetch_userinfo(endpoint, &token.access_token).await?,
            None => token.extra,
        };
        let groups = groups_claim(&claims, &self.config.groups_claim);

        debug!(groups = groups.len(), "[SSO] Token exchange successful");

        Ok(ProviderProfile {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            groups,
        })
    }
}

/// Read a groups claim given as an array of strings or a single string.
fn groups_claim(claims: &HashMap<String, Value>, claim: &str) -> BTreeSet<String> {
    match claims.get(claim) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(Value::String(group)) => BTreeSet::from([group.clone()]),
        _ => BTreeSet::new(),
    }
}
