use outbound_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn breaker(threshold: u32) -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        name: "registry".into(),
        failure_threshold: threshold,
        cooldown: Duration::from_secs(30),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn opens_exactly_at_threshold() {
    let breaker = breaker(5);

    for _ in 0..4 {
        assert!(breaker.allow());
        breaker.record_failure();
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.stats().consecutive_failures, 4);

    assert!(breaker.allow());
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.allow());

    let err = breaker.try_acquire().unwrap_err();
    assert_eq!(err.name, "registry");
    assert_eq!(err.consecutive_failures, 5);
}

#[tokio::test]
async fn success_resets_the_count() {
    let breaker = breaker(3);

    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    breaker.record_failure();
    breaker.record_failure();

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.stats().consecutive_failures, 2);
}

#[tokio::test]
async fn transitions_are_observable() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&transitions);
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        }
        .on_state_transition(move |from, to| {
            assert_eq!((from, to), (CircuitState::Closed, CircuitState::Open));
            counted.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(transitions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn manual_overrides() {
    let breaker = breaker(5);

    breaker.force_open();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(breaker.retry_after().is_some());

    breaker.reset();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.stats().consecutive_failures, 0);
    assert!(breaker.allow());
}

#[test]
fn invalid_config_is_rejected() {
    for config in [
        CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        },
        CircuitBreakerConfig {
            half_open_max_probes: 0,
            ..Default::default()
        },
    ] {
        assert!(CircuitBreaker::new(config).is_err());
    }
}
