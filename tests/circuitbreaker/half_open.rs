use outbound_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::time::Duration;

const COOLDOWN: Duration = Duration::from_secs(30);

fn tripped(max_probes: u32) -> CircuitBreaker {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 5,
        cooldown: COOLDOWN,
        half_open_max_probes: max_probes,
        ..Default::default()
    })
    .unwrap();
    for _ in 0..5 {
        breaker.record_failure();
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    breaker
}

#[tokio::test(start_paused = true)]
async fn rejects_until_cooldown_then_admits_one_probe() {
    let breaker = tripped(1);

    tokio::time::advance(COOLDOWN - Duration::from_millis(1)).await;
    assert!(!breaker.allow());
    assert_eq!(breaker.retry_after(), Some(Duration::from_millis(1)));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(breaker.allow());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(!breaker.allow(), "second probe must wait for the first");
    assert_eq!(breaker.stats().probes_in_flight, 1);
}

#[tokio::test(start_paused = true)]
async fn probe_success_closes_with_zero_failures() {
    let breaker = tripped(1);
    tokio::time::advance(COOLDOWN).await;

    assert!(breaker.allow());
    breaker.record_success();

    let stats = breaker.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.consecutive_failures, 0);
    assert!(breaker.allow());
}

#[tokio::test(start_paused = true)]
async fn probe_failure_reopens_and_restarts_cooldown() {
    let breaker = tripped(2);
    tokio::time::advance(COOLDOWN).await;

    assert!(breaker.allow());
    assert!(breaker.allow());
    assert!(!breaker.allow());

    // one failing probe reopens even though the other is still outstanding
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.allow());

    tokio::time::advance(COOLDOWN / 2).await;
    assert!(!breaker.allow());
    tokio::time::advance(COOLDOWN / 2).await;
    assert!(breaker.allow());
}

#[tokio::test(start_paused = true)]
async fn released_probe_frees_the_slot() {
    let breaker = tripped(1);
    tokio::time::advance(COOLDOWN).await;

    assert!(breaker.allow());
    breaker.release_probe();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.allow());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_respect_probe_limit() {
    let breaker = tripped(3);
    tokio::time::advance(COOLDOWN).await;

    let admitted: usize = futures::future::join_all((0..20).map(|_| {
        let breaker = breaker.clone();
        async move { breaker.allow() }
    }))
    .await
    .into_iter()
    .filter(|admitted| *admitted)
    .count();

    assert_eq!(admitted, 3);
}
