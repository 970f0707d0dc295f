use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;
use outbound_resilience_core::{ConfigError, EventListeners};
use std::time::Duration;

/// Configuration for a [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CircuitBreakerConfig {
    /// Instance name used in errors, events, logs and metrics.
    pub name: String,

    /// Consecutive failures that trip the circuit. At least 1.
    ///
    /// Default: 5
    pub failure_threshold: u32,

    /// How long the circuit stays open before admitting a probe.
    ///
    /// Default: 30 seconds
    #[cfg_attr(feature = "serde", serde(with = "outbound_resilience_core::duration_ms"))]
    pub cooldown: Duration,

    /// Probes that may be outstanding at once while half-open. At least 1.
    ///
    /// Default: 1
    pub half_open_max_probes: u32,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: String::from("circuit_breaker"),
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            half_open_max_probes: 1,
            event_listeners: EventListeners::new(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker",
                "failure_threshold",
                "must be at least 1",
            ));
        }
        if self.half_open_max_probes == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker",
                "half_open_max_probes",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Registers a callback for state transitions, called with `(from, to)`.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        });
        self
    }

    /// Registers a callback invoked when a call is admitted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked with the consecutive failure count after
    /// each recorded failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if let CircuitBreakerEvent::FailureRecorded {
                consecutive_failures,
                ..
            } = event
            {
                f(*consecutive_failures);
            }
        });
        self
    }
}
