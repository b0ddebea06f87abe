//! Full login round trip through the gateway's HTTP routes

use botgate_core::{AuthEvent, ProviderProfile};
use botgate_gateway::{
    CommandRequest, GatewayServer, GatewayServerConfig, HostState, MiddlewareOutcome, SsoState,
};
use pretty_assertions::assert_eq;
use reqwest::{redirect, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tests::events::collect_events;
use tests::fixtures;
use tests::harness::AuthHarness;
use tests::RecordingProvider;
use tokio::net::TcpListener;

/// Serve the gateway router on an ephemeral port
async fn serve(harness: &AuthHarness, provider: RecordingProvider) -> SocketAddr {
    let host = HostState::new(Arc::new(harness.middleware()), harness.bus.clone());
    let server = GatewayServer::new(GatewayServerConfig::default(), host).with_sso(SsoState {
        handshake: harness.sso().clone(),
        provider: Arc::new(provider),
    });
    let service = server
        .router()
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, service).await.unwrap();
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

/// Local URL for a path on the public base URL
fn local(addr: SocketAddr, public_url: &str) -> String {
    let path = public_url.trim_start_matches(fixtures::BASE_URL);
    format!("http://{}{}", addr, path)
}

async fn sso_harness() -> AuthHarness {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    AuthHarness::build(config, None).await
}

fn private_login_url(outcome: MiddlewareOutcome) -> String {
    match outcome {
        MiddlewareOutcome::ShortCircuit {
            private_reply: Some(reply),
            ..
        } => reply
            .split_whitespace()
            .find(|word| word.starts_with(fixtures::BASE_URL))
            .expect("login url in reply")
            .to_string(),
        other => panic!("expected login prompt, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_round_trip_grants_access() {
    let harness = sso_harness().await;
    let events = harness.bus.subscribe();
    let provider = RecordingProvider::new()
        .with_code("good", ProviderProfile::new("at", Some("rt".into()), ["admin"]));
    let addr = serve(&harness, provider.clone()).await;
    let http = client();

    let mut request = CommandRequest::new("d@x.com", "app.remove");
    request.room = Some("ops".to_string());
    let login_url = private_login_url(harness.middleware().handle(&request).await);
    let token = fixtures::login_token(&login_url).to_string();

    // Login link redirects to the provider with the token as state
    let response = http.get(local(addr, &login_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.contains(&format!("state={}", token)));

    // Provider redirects back with a code
    let response = http
        .get(format!("http://{}/sso/callback?code=good&state={}", addr, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        provider.exchanges(),
        vec![(
            "good".to_string(),
            "https://bot.example.com/sso/callback".to_string()
        )]
    );

    let record = harness.credentials.snapshot("d@x.com").await.unwrap();
    assert_eq!(record.refresh_token.as_deref(), Some("rt"));
    assert!(harness.context.decide("d@x.com", "app.remove").await.is_allowed());

    let events = collect_events(events, Duration::from_millis(100)).await;
    match events.as_slice() {
        [AuthEvent::LoginCompleted { identity, room, .. }] => {
            assert_eq!(identity, "d@x.com");
            assert_eq!(room.as_deref(), Some("ops"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[tokio::test]
async fn test_host_api_login_round_trip() {
    let harness = sso_harness().await;
    let provider = RecordingProvider::new()
        .with_code("good", ProviderProfile::new("at", None, ["admin"]));
    let addr = serve(&harness, provider).await;
    let http = client();
    let authorize = format!("http://{}/authorize", addr);
    let request = CommandRequest::new("h@x.com", "app.remove");

    let outcome: MiddlewareOutcome = http
        .post(&authorize)
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let login_url = private_login_url(outcome);
    let token = fixtures::login_token(&login_url).to_string();

    assert_eq!(
        http.get(local(addr, &login_url)).send().await.unwrap().status(),
        StatusCode::SEE_OTHER
    );
    let response = http
        .get(format!("http://{}/sso/callback?code=good&state={}", addr, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome: MiddlewareOutcome = http
        .post(&authorize)
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outcome, MiddlewareOutcome::Continue);
}

#[tokio::test]
async fn test_host_logout_returns_identity_to_login() {
    let harness = sso_harness().await;
    let addr = serve(&harness, RecordingProvider::new()).await;
    let http = client();

    harness
        .credentials
        .store_login("i@x.com", ProviderProfile::new("at", None, ["admin"]))
        .await
        .unwrap();
    assert!(harness.context.decide("i@x.com", "app.remove").await.is_allowed());

    let response = http
        .post(format!("http://{}/logout", addr))
        .json(&serde_json::json!({ "identity": "i@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(harness
        .context
        .decide("i@x.com", "app.remove")
        .await
        .login_url()
        .is_some());
}

#[tokio::test]
async fn test_callback_is_single_use() {
    let harness = sso_harness().await;
    let provider = RecordingProvider::new()
        .with_code("good", ProviderProfile::new("at", None, ["reader"]));
    let addr = serve(&harness, provider).await;
    let http = client();

    let login_url = harness.sso().begin_login("e@x.com", None, None);
    let callback = format!(
        "http://{}/sso/callback?code=good&state={}",
        addr,
        fixtures::login_token(&login_url)
    );

    assert_eq!(http.get(&callback).send().await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        http.get(&callback).send().await.unwrap().status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_rejected_code_leaves_session_pending() {
    let harness = sso_harness().await;
    let addr = serve(&harness, RecordingProvider::new()).await;
    let http = client();

    let login_url = harness.sso().begin_login("f@x.com", None, None);
    let token = fixtures::login_token(&login_url).to_string();

    let response = http
        .get(format!("http://{}/sso/callback?code=stolen&state={}", addr, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert!(harness.sso().sessions().contains(&token));
    let record = harness.credentials.snapshot("f@x.com").await.unwrap();
    assert!(!record.has_token());
}

#[tokio::test]
async fn test_expired_session_cannot_complete() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    config.sso.session_ttl = Some(Duration::from_millis(1));
    let harness = AuthHarness::build(config, None).await;

    let login_url = harness.sso().begin_login("g@x.com", None, None);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = harness
        .sso()
        .complete_login(
            fixtures::login_token(&login_url),
            ProviderProfile::new("at", None, ["admin"]),
        )
        .await;
    assert!(matches!(result, Err(botgate_gateway::SsoError::SessionNotFound)));
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = sso_harness().await;
    let addr = serve(&harness, RecordingProvider::new()).await;

    let body: serde_json::Value = client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}
