use super::loopback_client;
use outbound_resilience_guard::{GuardConfig, GuardReason, GuardedClient, HttpError, StaticLookup};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn redirecting_to(location: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn redirect_to_metadata_address_is_blocked_at_the_hop() {
    let server = redirecting_to("http://169.254.169.254/latest/meta-data").await;
    let client = loopback_client(StaticLookup::new());

    let err = client
        .get(&format!("{}/start", server.uri()))
        .await
        .unwrap_err();

    let guard = err.guard_error().expect("guard rejection");
    assert_eq!(guard.reason, GuardReason::RedirectBlocked);
    assert!(guard.detail.contains("169.254.169.254"), "{}", guard.detail);
}

#[tokio::test]
async fn redirect_to_hostname_is_checked_at_connect_time() {
    let server = redirecting_to("http://metadata.test/latest/meta-data").await;
    let lookup = StaticLookup::new().with_host("metadata.test", ["169.254.169.254".parse().unwrap()]);
    let client = loopback_client(lookup);

    let err = client
        .get(&format!("{}/start", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err.guard_error().map(|guard| guard.reason),
        Some(GuardReason::PrivateDestination)
    );
}

#[tokio::test]
async fn redirect_to_ipv6_metadata_address_is_blocked() {
    let server = redirecting_to("http://[fd00:ec2::254]/latest/meta-data").await;
    let client = loopback_client(StaticLookup::new());

    let err = client
        .get(&format!("{}/start", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err.guard_error().map(|guard| guard.reason),
        Some(GuardReason::RedirectBlocked)
    );
}

#[tokio::test]
async fn allowed_redirects_are_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let client = loopback_client(StaticLookup::new());
    let body = client.get_text(&format!("{}/old", server.uri())).await.unwrap();
    assert_eq!(body, "moved");
}

#[tokio::test]
async fn redirect_loops_stop_at_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let config = GuardConfig {
        max_redirects: 2,
        ..Default::default()
    }
    .allow_loopback();
    let client = GuardedClient::with_lookup(&config, Arc::new(StaticLookup::new())).unwrap();

    let err = client
        .get(&format!("{}/loop", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Transport(_)));
}
