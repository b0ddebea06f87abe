//! Health and SSO browser handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use botgate_core::messages;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::SsoState;
use crate::sso::SsoError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    debug!("[Server] Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Start a login: send the browser to the identity provider with the
/// session token as `state`.
pub async fn sso_login(State(state): State<SsoState>, Path(token): Path<String>) -> Response {
    if !state.handshake.sessions().contains(&token) {
        warn!("[Server] Login link with unknown session");
        return (StatusCode::UNAUTHORIZED, messages::LOGIN_SESSION_UNKNOWN).into_response();
    }

    let url = state
        .provider
        .authorization_url(&token, &state.handshake.callback_url());
    debug!("[Server] Redirecting to identity provider");
    Redirect::to(&url).into_response()
}

/// Callback parameters from the authorization redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match &self.error_description {
            Some(desc) => format!("{}: {}", e, desc),
            None => e.clone(),
        })
    }
}

pub async fn sso_callback(
    State(state): State<SsoState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(message) = params.error_message() {
        warn!(error = %message, "[Server] Identity provider returned an error");
        return (StatusCode::BAD_REQUEST, format!("Login failed: {}", message)).into_response();
    }

    let (Some(code), Some(token)) = (params.code.as_deref(), params.state.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "Missing code or state").into_response();
    };

    // Skip the exchange for sessions that cannot complete
    if !state.handshake.sessions().contains(token) {
        warn!("[Server] Callback for unknown login session");
        return (StatusCode::UNAUTHORIZED, messages::LOGIN_SESSION_UNKNOWN).into_response();
    }

    let profile = match state
        .provider
        .exchange_code(code, &state.handshake.callback_url())
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, "[Server] Code exchange failed");
            return (StatusCode::BAD_GATEWAY, "Login failed: identity provider error")
                .into_response();
        }
    };

    match state.handshake.complete_login(token, profile).await {
        Ok(session) => {
            info!(identity = %session.identity, "[Server] SSO callback completed");
            (StatusCode::OK, messages::LOGIN_SUCCEEDED).into_response()
        }
        Err(SsoError::SessionNotFound) => {
            (StatusCode::UNAUTHORIZED, messages::LOGIN_SESSION_UNKNOWN).into_response()
        }
        Err(e) => {
            error!(error = %e, "[Server] Failed to complete login");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response()
        }
    }
}
