//! Connection states and how decisions react to them

use botgate_core::{DirectoryConfig, ProviderProfile};
use botgate_gateway::{ConnectionState, DirectoryClient, LdapConnector};
use std::time::Duration;
use tests::fixtures::{self, POWER_GROUP};
use tests::harness::AuthHarness;
use tests::ScriptedDirectory;

#[tokio::test]
async fn test_connects_once() {
    let directory = ScriptedDirectory::new();
    let client = DirectoryClient::new(fixtures::directory_config());

    assert_eq!(client.state(), ConnectionState::Uninitialized);
    assert_eq!(client.connect(&directory).await, ConnectionState::Connected);
    assert_eq!(client.connect(&directory).await, ConnectionState::Connected);
    assert_eq!(directory.connect_count(), 1);
    assert!(client.is_available());
}

#[tokio::test]
async fn test_unconfigured_directory_is_disabled_without_connecting() {
    let directory = ScriptedDirectory::new();
    let config = DirectoryConfig {
        bind_password: None,
        ..fixtures::directory_config()
    };
    let client = DirectoryClient::new(config);

    assert_eq!(client.connect(&directory).await, ConnectionState::Disabled);
    assert_eq!(directory.connect_count(), 0);
    // Degraded mode still counts as available, but nobody is a member
    assert!(client.is_available());
    assert!(
        !client
            .is_member_of_any_group("c@x.com", &[POWER_GROUP.to_string()])
            .await
    );
}

#[tokio::test]
async fn test_bind_failure_is_terminal() {
    tests::logging::init();
    let directory = ScriptedDirectory::new()
        .with_member(POWER_GROUP, "c@x.com")
        .with_bind_error("invalid credentials");
    let client = DirectoryClient::new(fixtures::directory_config());

    assert_eq!(client.connect(&directory).await, ConnectionState::Failed);
    assert!(!client.is_available());

    // No reconnect
    assert_eq!(client.connect(&directory).await, ConnectionState::Failed);
    assert_eq!(directory.connect_count(), 1);
}

#[tokio::test]
async fn test_failed_directory_falls_back_to_roster() {
    let mut config = fixtures::roster_config(&["a@x.com"], &[]);
    config.directory = fixtures::directory_config();
    let directory = ScriptedDirectory::new()
        .with_member(POWER_GROUP, "c@x.com")
        .with_bind_error("connection refused");

    let harness = AuthHarness::build(config, Some(&directory)).await;

    assert_eq!(harness.directory.state(), ConnectionState::Failed);
    assert!(!harness.context.decide("c@x.com", "app.remove").await.is_allowed());
    assert!(harness.context.decide("a@x.com", "app.list").await.is_allowed());
    assert_eq!(directory.search_count(), 0);
}

#[tokio::test]
async fn test_failed_directory_falls_back_to_sso() {
    let mut config = fixtures::roster_config(&[], &[]);
    config.directory = fixtures::directory_config();
    config.sso = fixtures::sso_config();
    let directory = ScriptedDirectory::new()
        .with_member(POWER_GROUP, "c@x.com")
        .with_bind_error("invalid credentials");

    let harness = AuthHarness::build(config, Some(&directory)).await;
    assert_eq!(harness.directory.state(), ConnectionState::Failed);

    let first = harness.context.decide("c@x.com", "app.remove").await;
    let login_url = first.login_url().expect("login url").to_string();
    assert!(login_url.starts_with("https://bot.example.com/sso/login/"));

    harness
        .sso()
        .complete_login(
            fixtures::login_token(&login_url),
            ProviderProfile::new("at", None, ["admin"]),
        )
        .await
        .unwrap();

    assert!(harness.context.decide("c@x.com", "app.remove").await.is_allowed());
    assert_eq!(directory.search_count(), 0);
}

#[tokio::test]
async fn test_unreachable_server_fails() {
    let config = DirectoryConfig {
        server: Some("127.0.0.1".to_string()),
        port: Some(1),
        ..fixtures::directory_config()
    };
    let client = DirectoryClient::new(config);
    let connector = LdapConnector::new()
        .with_timeouts(Duration::from_millis(500), Duration::from_millis(500));

    assert_eq!(client.connect(&connector).await, ConnectionState::Failed);
}
