//! Gateway HTTP server
//!
//! Host routes, called by the chat host adapter:
//! - `POST /authorize` decides an intercepted command
//! - `POST /forward` decides a forwarded command
//! - `POST /logout` clears an identity's SSO credentials
//! - `GET /events` streams authorization events as server-sent events
//!
//! Browser routes, mounted when SSO is configured:
//! - `GET /sso/login/{token}` redirects to the identity provider
//! - `GET /sso/callback?code&state` completes the login
//!
//! `GET /health` is always open. With a host token configured the host
//! routes require `Authorization: Bearer <token>`.

mod handlers;
mod host;
pub mod rate_limit;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use botgate_core::EventBus;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::AuthorizationMiddleware;
use crate::sso::{IdentityProvider, SsoHandshake};

pub use handlers::CallbackParams;
pub use host::{HostToken, LogoutRequest};

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// State shared by the host routes
#[derive(Clone)]
pub struct HostState {
    pub middleware: Arc<AuthorizationMiddleware>,
    pub events: EventBus,
    pub token: Option<HostToken>,
}

impl HostState {
    pub fn new(middleware: Arc<AuthorizationMiddleware>, events: EventBus) -> Self {
        Self {
            middleware,
            events,
            token: None,
        }
    }

    /// Require `token` as a bearer credential on the host routes
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(HostToken::new(token));
        self
    }
}

/// State shared by the SSO handlers
#[derive(Clone)]
pub struct SsoState {
    pub handshake: Arc<SsoHandshake>,
    pub provider: Arc<dyn IdentityProvider>,
}

pub struct GatewayServer {
    config: GatewayServerConfig,
    host: HostState,
    sso: Option<SsoState>,
}

impl GatewayServer {
    pub fn new(config: GatewayServerConfig, host: HostState) -> Self {
        Self {
            config,
            host,
            sso: None,
        }
    }

    /// Mount the SSO login and callback routes
    pub fn with_sso(mut self, sso: SsoState) -> Self {
        self.sso = Some(sso);
        self
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        build_router(self.host.clone(), self.sso.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        info!(
            addr = %self.config.listen_addr,
            sso = self.sso.is_some(),
            host_token = self.host.token.is_some(),
            "[Server] Gateway listening"
        );

        let service = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("[Server] Gateway stopped");
        Ok(())
    }
}

pub fn build_router(host: HostState, sso: Option<SsoState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .merge(host_routes(host));

    if let Some(sso) = sso {
        router = router.merge(sso_routes(sso));
    }

    router.layer(TraceLayer::new_for_http())
}

fn host_routes(state: HostState) -> Router {
    let token = state.token.clone();
    let mut routes = Router::new()
        .route("/authorize", post(host::authorize))
        .route("/forward", post(host::forward))
        .route("/logout", post(host::logout))
        .route("/events", get(host::events))
        .with_state(state)
        .layer(middleware::from_fn(host::require_host_token));

    if let Some(token) = token {
        routes = routes.layer(Extension(token));
    }
    routes
}

fn sso_routes(state: SsoState) -> Router {
    Router::new()
        .route("/sso/login/{token}", get(handlers::sso_login))
        .route("/sso/callback", get(handlers::sso_callback))
        .with_state(state)
        .layer(middleware::from_fn(rate_limit::rate_limit_middleware))
        // Outermost, so the limiter is in the extensions before the check runs
        .layer(Extension(rate_limit::default_sso_rate_limiter()))
}
