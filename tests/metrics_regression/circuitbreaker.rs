//! Circuit breaker metrics regression tests

use super::helpers::*;
use outbound_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn circuitbreaker_call_metrics() {
    init_recorder();

    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        name: "metrics_breaker".to_string(),
        failure_threshold: 2,
        cooldown: Duration::from_secs(60),
        ..Default::default()
    })
    .unwrap();

    assert!(breaker.allow());
    breaker.record_success();
    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.allow());

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_breaker");
    for outcome in ["permitted", "rejected", "success", "failure"] {
        assert_metric_has_label("circuitbreaker_calls_total", "outcome", outcome);
    }
}

#[test]
#[serial]
fn circuitbreaker_transition_metrics() {
    init_recorder();

    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        name: "transition_breaker".to_string(),
        failure_threshold: 1,
        cooldown: Duration::ZERO,
        ..Default::default()
    })
    .unwrap();

    breaker.record_failure();
    assert!(breaker.allow());
    breaker.record_success();

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "Closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Open");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "HalfOpen");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Closed");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "transition_breaker");
}
