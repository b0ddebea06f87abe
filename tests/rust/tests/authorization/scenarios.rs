//! Decisions across roster, directory groups and SSO fallback

use botgate_core::{AuthEvent, ProviderProfile};
use botgate_gateway::{CommandRequest, Decision, ForwardRequest, MiddlewareOutcome};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tests::events::wait_for_event;
use tests::fixtures::{self, POWER_GROUP, READER_GROUP};
use tests::harness::AuthHarness;
use tests::ScriptedDirectory;

#[tokio::test]
async fn test_roster_reader_can_list_but_not_remove() {
    let harness = AuthHarness::build(fixtures::roster_config(&["a@x.com"], &[]), None).await;

    assert_eq!(harness.context.decide("a@x.com", "app.list").await, Decision::Allow);
    assert_eq!(harness.context.decide("a@x.com", "app.remove").await, Decision::deny());
}

#[tokio::test]
async fn test_unclassified_command_needs_no_identity() {
    let harness = AuthHarness::build(fixtures::roster_config(&[], &[]), None).await;

    assert!(harness.context.decide("", "help").await.is_allowed());
    assert!(harness.context.decide("stranger@x.com", "weather.today").await.is_allowed());
}

#[tokio::test]
async fn test_anonymous_caller_gets_no_login_link() {
    let mut config = fixtures::roster_config(&["", "a@x.com"], &[""]);
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;

    assert_eq!(harness.context.decide("", "app.list").await, Decision::deny());
    assert_eq!(harness.context.decide("", "app.remove").await, Decision::deny());
    assert!(harness.sso().sessions().is_empty());
}

#[tokio::test]
async fn test_directory_power_group_grants_power_and_reader() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.directory = fixtures::directory_config();
    let directory = ScriptedDirectory::new().with_member(POWER_GROUP, "c@x.com");

    let harness = AuthHarness::build(config, Some(&directory)).await;

    assert!(harness.context.decide("c@x.com", "app.remove").await.is_allowed());
    assert!(harness.context.decide("c@x.com", "app.list").await.is_allowed());
}

#[tokio::test]
async fn test_directory_reader_group_is_not_power() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.directory = fixtures::directory_config();
    let directory = ScriptedDirectory::new().with_member(READER_GROUP, "r@x.com");

    let harness = AuthHarness::build(config, Some(&directory)).await;

    assert!(harness.context.decide("r@x.com", "app.list").await.is_allowed());
    assert!(!harness.context.decide("r@x.com", "app.remove").await.is_allowed());
}

#[tokio::test]
async fn test_reader_decision_resolves_both_tiers() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.directory = fixtures::directory_config();
    let directory = ScriptedDirectory::new().with_member(READER_GROUP, "r@x.com");

    let harness = AuthHarness::build(config, Some(&directory)).await;

    assert!(harness.context.decide("r@x.com", "app.list").await.is_allowed());
    // Reader and power groups, each a DN lookup plus a membership search
    assert_eq!(directory.search_count(), 4);
}

#[tokio::test]
async fn test_sso_login_then_admin_access() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;
    let mut events = harness.bus.subscribe();

    // No token yet: denied with a login link
    let first = harness.context.decide("d@x.com", "app.remove").await;
    let login_url = first.login_url().expect("login url").to_string();
    assert!(login_url.starts_with("https://bot.example.com/sso/login/"));

    let token = fixtures::login_token(&login_url);
    harness
        .sso()
        .complete_login(token, ProviderProfile::new("at", None, ["admin"]))
        .await
        .unwrap();

    let event = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, AuthEvent::LoginCompleted { .. })
    })
    .await;
    assert_eq!(event.map(|e| e.identity().to_string()), Some("d@x.com".to_string()));

    assert!(harness.context.decide("d@x.com", "app.remove").await.is_allowed());
    assert!(harness.context.decide("d@x.com", "app.list").await.is_allowed());
}

#[tokio::test]
async fn test_sso_reader_claim_is_not_power() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;

    harness
        .credentials
        .store_login("e@x.com", ProviderProfile::new("at", None, ["reader"]))
        .await
        .unwrap();

    assert!(harness.context.decide("e@x.com", "app.list").await.is_allowed());
    // Token present but claim too weak: plain denial, no login link
    assert_eq!(harness.context.decide("e@x.com", "app.remove").await, Decision::deny());
}

#[tokio::test]
async fn test_logout_sends_identity_back_to_login() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;

    harness
        .credentials
        .store_login("f@x.com", ProviderProfile::new("at", None, ["admin"]))
        .await
        .unwrap();
    assert!(harness.context.decide("f@x.com", "app.remove").await.is_allowed());

    harness.sso().logout("f@x.com").await.unwrap();

    let decision = harness.context.decide("f@x.com", "app.remove").await;
    assert!(decision.login_url().is_some());
}

#[tokio::test]
async fn test_middleware_keeps_login_link_private() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;

    let mut request = CommandRequest::new("g@x.com", "app.remove");
    request.room = Some("ops".to_string());

    match harness.middleware().handle(&request).await {
        MiddlewareOutcome::ShortCircuit {
            public_reply,
            private_reply,
        } => {
            assert!(!public_reply.contains("/sso/login/"));
            assert!(private_reply.expect("private reply").contains("/sso/login/"));
        }
        MiddlewareOutcome::Continue => panic!("expected short circuit"),
    }

    // The pending session remembers where the request came from
    assert_eq!(harness.sso().sessions().len(), 1);
}

#[tokio::test]
async fn test_forward_is_authorized_against_target() {
    let harness = AuthHarness::build(fixtures::roster_config(&["a@x.com"], &[]), None).await;
    let mut events = harness.bus.subscribe();
    let middleware = harness.middleware();

    let denied = middleware
        .forward(ForwardRequest {
            identity: Some("a@x.com".to_string()),
            target: "app.remove".to_string(),
            parameters: json!({ "name": "web" }),
            room: None,
            team: None,
        })
        .await;
    assert!(!denied.is_continue());

    let approved = middleware
        .forward(ForwardRequest {
            identity: Some("a@x.com".to_string()),
            target: "app.list".to_string(),
            parameters: json!({ "region": "eu" }),
            room: None,
            team: None,
        })
        .await;
    assert!(approved.is_continue());

    match events.try_recv() {
        Some(AuthEvent::ForwardApproved { target, parameters, .. }) => {
            assert_eq!(target, "app.list");
            assert_eq!(parameters, json!({ "region": "eu" }));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_disabled_authorization_allows_everything() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.authentication_disabled = true;
    config.sso = fixtures::sso_config();
    let harness = AuthHarness::build(config, None).await;

    assert!(harness.context.decide("nobody@x.com", "app.remove").await.is_allowed());
    assert!(harness.sso().sessions().is_empty());
}
