use outbound_resilience::circuitbreaker::CircuitState;
use outbound_resilience::guard::{HttpError, StaticLookup};
use outbound_resilience::{
    CancelCause, RequestContext, ResilienceConfig, ResilienceError, ResilientClient,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Company {
    id: String,
    name: String,
}

fn config() -> ResilienceConfig {
    let mut config = ResilienceConfig::default();
    config.guard = config.guard.allow_loopback();
    config.circuit_breaker.name = "registry".into();
    config.circuit_breaker.failure_threshold = 3;
    config
}

fn client(config: ResilienceConfig) -> ResilientClient<Company, HttpError> {
    ResilientClient::with_lookup(config, Arc::new(StaticLookup::new())).unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn concurrent_identical_requests_reach_the_upstream_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/companies/123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "123", "name": "Acme" }))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let client = client(config());
    let url = format!("{}/companies/123", server.uri());
    let ctx = RequestContext::new();

    let results = futures::future::join_all((0..10).map(|_| client.get_json(&ctx, &url))).await;
    for result in results {
        assert_eq!(result.unwrap().name, "Acme");
    }

    // a later call is a cache hit
    assert_eq!(client.get_json(&ctx, &url).await.unwrap().id, "123");
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn failing_upstream_opens_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(config());
    let ctx = RequestContext::new();

    for i in 0..3 {
        let url = format!("{}/companies/{}", server.uri(), i);
        let err = client.get_json(&ctx, &url).await.unwrap_err();
        assert_eq!(
            err.upstream().and_then(HttpError::status),
            Some(reqwest::StatusCode::SERVICE_UNAVAILABLE)
        );
    }
    assert_eq!(client.breaker().state(), CircuitState::Open);

    let err = client
        .get_json(&ctx, &format!("{}/companies/4", server.uri()))
        .await
        .unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn guard_rejections_are_surfaced_but_not_counted() {
    let mut config = config();
    config.circuit_breaker.failure_threshold = 1;
    let client = client(config);
    let ctx = RequestContext::new();

    for _ in 0..3 {
        let err = client
            .get_json(&ctx, "http://169.254.169.254/latest/meta-data")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResilienceError::GuardRejected {
                reason: outbound_resilience::guard::GuardReason::PrivateDestination,
                ..
            }
        ));
    }
    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn redirect_into_the_metadata_service_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/companies/123"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "http://169.254.169.254/latest/meta-data"),
        )
        .mount(&server)
        .await;

    let client = client(config());
    let err = client
        .get_json(&RequestContext::new(), &format!("{}/companies/123", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err.guard_reason(),
        Some(outbound_resilience::guard::GuardReason::RedirectBlocked)
    );
    assert_eq!(client.breaker().stats().consecutive_failures, 0);
}

#[tokio::test]
async fn caller_deadline_returns_promptly_and_the_result_is_still_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "9", "name": "Slow AS" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = client(config());
    let url = format!("{}/companies/9", server.uri());

    let impatient = RequestContext::with_timeout(Duration::from_millis(20));
    let err = client.get_json(&impatient, &url).await.unwrap_err();
    assert!(matches!(
        err,
        ResilienceError::Canceled {
            cause: CancelCause::DeadlineExceeded
        }
    ));
    // the execution keeps the caller's slot until the upstream answers
    assert_eq!(client.limiter().in_use(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.limiter().in_use(), 0);
    assert_eq!(client.cache().len(), 1);
    let company = client.get_json(&RequestContext::new(), &url).await.unwrap();
    assert_eq!(company.name, "Slow AS");
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn request_timeout_counts_as_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = config();
    config.guard.request_timeout = Duration::from_millis(100);
    let client = client(config);

    let err = client
        .get_json(&RequestContext::new(), &server.uri())
        .await
        .unwrap_err();
    assert!(err.counts_as_failure(), "{:?}", err);
    assert_eq!(client.breaker().stats().consecutive_failures, 1);
}

#[tokio::test]
async fn execute_hands_out_the_guarded_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
        .mount(&server)
        .await;

    let client: ResilientClient<String, HttpError> =
        ResilientClient::with_lookup(config(), Arc::new(StaticLookup::new())).unwrap();
    let url = server.uri();

    let body = client
        .execute("plain", &RequestContext::new(), move |http| async move {
            http.get_text(&url).await.map_err(ResilienceError::from)
        })
        .await
        .unwrap();
    assert_eq!(body, "plain");
}
