//! Property tests for circuit breaker invariants.

use outbound_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use proptest::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Op {
    Allow,
    Success,
    Failure,
    Release,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allow),
        2 => Just(Op::Success),
        2 => Just(Op::Failure),
        1 => Just(Op::Release),
    ]
}

proptest! {
    /// Probes in flight never exceed the limit, and a closed circuit is
    /// always below the threshold.
    #[test]
    fn probe_limit_and_threshold_hold(
        threshold in 1u32..6,
        max_probes in 1u32..4,
        ops in prop::collection::vec(op(), 1..200),
    ) {
        // zero cooldown: every admission attempt while open moves to half-open
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::ZERO,
            half_open_max_probes: max_probes,
            ..Default::default()
        })
        .unwrap();

        for op in ops {
            match op {
                Op::Allow => {
                    breaker.allow();
                }
                Op::Success => breaker.record_success(),
                Op::Failure => breaker.record_failure(),
                Op::Release => breaker.release_probe(),
            }

            let stats = breaker.stats();
            prop_assert_eq!(stats.state, breaker.state());
            prop_assert!(stats.probes_in_flight <= max_probes);
            if stats.state == CircuitState::Closed {
                prop_assert!(stats.consecutive_failures < threshold);
            }
        }
    }

    /// A success in half-open always ends closed with no failures counted.
    #[test]
    fn probe_success_fully_recovers(threshold in 1u32..10, extra in 0u32..10) {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::ZERO,
            ..Default::default()
        })
        .unwrap();

        for _ in 0..threshold + extra {
            breaker.record_failure();
        }
        prop_assert_eq!(breaker.state(), CircuitState::Open);

        prop_assert!(breaker.allow());
        prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();

        prop_assert_eq!(breaker.state(), CircuitState::Closed);
        prop_assert_eq!(breaker.stats().consecutive_failures, 0);
    }
}
