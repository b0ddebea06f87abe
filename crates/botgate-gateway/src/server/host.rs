//! Host API: the chat host adapter posts intercepted commands here and
//! follows the event stream to re-dispatch approved forwards and to confirm
//! completed logins in the originating room.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use botgate_core::EventReceiver;
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::HostState;
use crate::middleware::{CommandRequest, ForwardRequest, MiddlewareOutcome};

/// Shared secret the host presents as a bearer token
#[derive(Clone)]
pub struct HostToken(Arc<str>);

impl HostToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len()
            && expected
                .iter()
                .zip(presented)
                .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for HostToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostToken(..)")
    }
}

/// Rejects host calls without the configured bearer token. Without a
/// token in the extensions every call passes.
pub async fn require_host_token(request: Request, next: Next) -> Response {
    if let Some(token) = request.extensions().get::<HostToken>() {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if !presented.is_some_and(|p| token.matches(p)) {
            warn!(path = request.uri().path(), "[Server] Host call without valid token");
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "Missing or invalid host token",
            )
                .into_response();
        }
    }

    next.run(request).await
}

pub async fn authorize(
    State(state): State<HostState>,
    Json(request): Json<CommandRequest>,
) -> Json<MiddlewareOutcome> {
    Json(state.middleware.handle(&request).await)
}

pub async fn forward(
    State(state): State<HostState>,
    Json(request): Json<ForwardRequest>,
) -> Json<MiddlewareOutcome> {
    Json(state.middleware.forward(request).await)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub identity: String,
}

pub async fn logout(
    State(state): State<HostState>,
    Json(request): Json<LogoutRequest>,
) -> Response {
    let Some(sso) = state.middleware.context().sso() else {
        return (StatusCode::NOT_FOUND, "SSO is not configured").into_response();
    };

    match sso.logout(&request.identity).await {
        Ok(()) => {
            info!(identity = %request.identity, "[Server] Logout requested by host");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!(error = %e, "[Server] Logout failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Logout failed").into_response()
        }
    }
}

/// One SSE message per `AuthEvent`, named after its type, JSON payload
pub async fn events(
    State(state): State<HostState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("[Server] Host subscribed to events");
    Sse::new(event_stream(state.events.subscribe())).keep_alive(KeepAlive::default())
}

fn event_stream(events: EventReceiver) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(events, |mut events| async move {
        loop {
            let event = events.recv().await?;
            match Event::default().event(event.type_name()).json_data(&event) {
                Ok(message) => return Some((Ok(message), events)),
                Err(e) => error!(error = %e, "[Server] Failed to encode event, skipping"),
            }
        }
    })
}
