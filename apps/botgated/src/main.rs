//! Botgate daemon
//!
//! Loads configuration, opens the brain, binds the directory and serves the
//! gateway: the host API the chat adapter calls for every command, plus the
//! SSO login/callback routes when an identity provider is configured.

mod logging;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use botgate_core::{create_shared_event_bus, AuthConfig, AuthEvent, Brain, EventReceiver};
use botgate_gateway::{
    AuthorizationContext, AuthorizationMiddleware, CredentialStore, DirectoryClient,
    GatewayServer, GatewayServerConfig, HostState, LdapConnector, OidcProvider, SessionStore,
    SsoHandshake, SsoState,
};
use botgate_storage::{Database, FieldEncryptor, SqliteBrain};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use settings::HostSettings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init_tracing()?;

    info!("[Server] Starting botgated v{}", env!("CARGO_PKG_VERSION"));

    let config = AuthConfig::from_env().context("Invalid authorization configuration")?;
    let host = HostSettings::from_env()?;

    if config.authentication_disabled {
        warn!("[Authz] Authorization is DISABLED; every command will be allowed");
    }

    let brain = open_brain(&host)?;
    let bus = create_shared_event_bus();
    spawn_event_logger(bus.subscribe());

    let directory = Arc::new(DirectoryClient::new(config.directory.clone()));
    let state = directory.connect(&LdapConnector::new()).await;
    info!(%state, "[Directory] Directory client ready");

    let credentials = Arc::new(CredentialStore::new(brain));
    let mut context = AuthorizationContext::new(&config, directory);

    let sso = match (&config.sso.base_url, &config.sso.provider) {
        (Some(base_url), Some(provider)) if config.sso.enabled => {
            let handshake = Arc::new(SsoHandshake::new(
                base_url,
                SessionStore::new(config.sso.session_ttl),
                credentials.clone(),
                bus.sender(),
            ));
            context = context.with_sso(handshake.clone());
            Some(SsoState {
                handshake,
                provider: Arc::new(OidcProvider::new(provider.clone())),
            })
        }
        _ if config.sso.enabled => {
            warn!("[SSO] Enabled without a base URL and identity provider; SSO fallback disabled");
            None
        }
        _ => None,
    };
    let context = Arc::new(context);

    info!(
        sso = context.sso().is_some(),
        directory = %context.directory().state(),
        "[Authz] Authorization context built"
    );

    let middleware = Arc::new(AuthorizationMiddleware::new(context, bus.sender()));
    let mut host_state = HostState::new(middleware, (*bus).clone());
    match &host.host_token {
        Some(token) => host_state = host_state.with_token(token.clone()),
        None => warn!("[Server] No host token set; host API is open to anyone who can reach it"),
    }

    let mut server = GatewayServer::new(
        GatewayServerConfig {
            listen_addr: host.listen_addr,
        },
        host_state,
    );
    if let Some(sso) = sso {
        server = server.with_sso(sso);
    }
    server.run(shutdown_signal()).await
}

fn open_brain(host: &HostSettings) -> Result<Arc<dyn Brain>> {
    let db = Database::open(&host.database_path)
        .with_context(|| format!("Failed to open brain at {:?}", host.database_path))?;
    let mut brain = SqliteBrain::new(Arc::new(Mutex::new(db)));

    match &host.brain_key {
        Some(key) => {
            brain = brain.with_encryptor(Arc::new(FieldEncryptor::new(key)?));
            info!(path = ?host.database_path, "[Brain] Opened (encrypted)");
        }
        None => {
            warn!(path = ?host.database_path, "[Brain] Opened without encryption key");
        }
    }

    Ok(Arc::new(brain))
}

fn spawn_event_logger(mut events: EventReceiver) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                AuthEvent::LoginCompleted { identity, room, team, .. } => info!(
                    identity = %identity,
                    room = room.as_deref().unwrap_or("-"),
                    team = team.as_deref().unwrap_or("-"),
                    "[Server] Login completed"
                ),
                AuthEvent::LoggedOut { identity } => {
                    info!(identity = %identity, "[Server] Logged out")
                }
                AuthEvent::ForwardApproved { identity, target, .. } => info!(
                    identity = %identity,
                    forward_to = %target,
                    "[Server] Forward approved"
                ),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "[Server] Failed to listen for shutdown signal");
    }
    info!("[Server] Shutdown requested");
}
