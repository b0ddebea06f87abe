//! In-memory brain and identity provider for the server tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use botgate_core::{Brain, EventBus, ProviderProfile, RepoResult};
use serde_json::Value;
use url::Url;

use super::SsoState;
use crate::credential_store::CredentialStore;
use crate::sso::{IdentityProvider, ProviderError, SessionStore, SsoHandshake};

#[derive(Default)]
pub struct MapBrain(parking_lot::Mutex<HashMap<String, Value>>);

#[async_trait]
impl Brain for MapBrain {
    async fn get(&self, key: &str) -> RepoResult<Option<Value>> {
        Ok(self.0.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> RepoResult<()> {
        self.0.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Grants `admin` for any code except `bad`
pub struct StaticProvider;

#[async_trait]
impl IdentityProvider for StaticProvider {
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        format!("https://idp.test/authorize?state={}&redirect_uri={}", state, redirect_uri)
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        if code == "bad" {
            return Err(ProviderError::Authorization("invalid_grant".into()));
        }
        Ok(ProviderProfile::new("at", Some("rt".into()), ["admin"]))
    }
}

pub fn sso_state(bus: &EventBus) -> SsoState {
    let base = Url::parse("https://bot.example.com").unwrap();
    let credentials = Arc::new(CredentialStore::new(Arc::new(MapBrain::default())));
    SsoState {
        handshake: Arc::new(SsoHandshake::new(
            &base,
            SessionStore::new(None),
            credentials,
            bus.sender(),
        )),
        provider: Arc::new(StaticProvider),
    }
}
