//! Fixed-window request limits for the SSO endpoints, keyed by route prefix
//! and client address. One noisy client cannot lock others out of login.

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const LOGIN_LIMIT_PER_MINUTE: u32 = 60;

/// Expired windows are swept once this many are tracked
const PRUNE_THRESHOLD: usize = 4096;

/// At most `max_requests` per `window` for paths under `prefix`.
#[derive(Debug, Clone)]
pub struct RouteLimit {
    pub prefix: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

struct Window {
    opened: Instant,
    used: u32,
}

/// Requests without a known peer address share one window per route.
type WindowKey = (&'static str, Option<IpAddr>);

#[derive(Clone)]
pub struct RateLimiter {
    limits: Arc<[RouteLimit]>,
    windows: Arc<DashMap<WindowKey, Window>>,
}

impl RateLimiter {
    pub fn new(limits: impl Into<Arc<[RouteLimit]>>) -> Self {
        Self {
            limits: limits.into(),
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Count a request from `client` for `path`; false once that client is
    /// over the route's limit. Paths without a limit always pass.
    pub fn allow(&self, path: &str, client: Option<IpAddr>) -> bool {
        let Some(limit) = self.limits.iter().find(|l| path.starts_with(l.prefix)) else {
            return true;
        };

        if self.windows.len() >= PRUNE_THRESHOLD {
            self.prune_expired();
        }

        let mut window = self
            .windows
            .entry((limit.prefix, client))
            .or_insert_with(|| Window {
                opened: Instant::now(),
                used: 0,
            });

        if window.opened.elapsed() >= limit.window {
            window.opened = Instant::now();
            window.used = 0;
        }

        if window.used >= limit.max_requests {
            return false;
        }
        window.used += 1;
        true
    }

    /// Number of (route, client) windows currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn prune_expired(&self) {
        let limits = &self.limits;
        self.windows.retain(|(prefix, _), window| {
            limits
                .iter()
                .find(|l| l.prefix == *prefix)
                .is_some_and(|l| window.opened.elapsed() < l.window)
        });
    }
}

/// Rejects with 429 when the limiter in the request extensions says so.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<RateLimiter>() {
        let path = request.uri().path();
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        if !limiter.allow(path, client) {
            warn!(path, ?client, "[Server] Rate limit exceeded");
            return (StatusCode::TOO_MANY_REQUESTS, "Too many login attempts, try again later")
                .into_response();
        }
    }

    next.run(request).await
}

pub fn default_sso_rate_limiter() -> RateLimiter {
    let per_minute = |prefix| RouteLimit {
        prefix,
        max_requests: LOGIN_LIMIT_PER_MINUTE,
        window: Duration::from_secs(60),
    };
    RateLimiter::new(vec![per_minute("/sso/login"), per_minute("/sso/callback")])
}
