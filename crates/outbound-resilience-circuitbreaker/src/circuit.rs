use crate::config::CircuitBreakerConfig;
use crate::error::CircuitBreakerError;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are admitted.
    Closed = 0,
    /// Calls are rejected until the cooldown elapses.
    Open = 1,
    /// A bounded number of probe calls are admitted.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Snapshot of a circuit breaker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// When the most recent failure was recorded.
    pub last_failure_at: Option<Instant>,
    /// When the circuit last opened; the cooldown runs from here.
    pub opened_at: Option<Instant>,
    pub probes_in_flight: u32,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
    probes_in_flight: u32,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            consecutive_failures: 0,
            last_failure_at: None,
            opened_at: None,
            probes_in_flight: 0,
        }
    }

    pub(crate) fn stats(&self) -> CircuitStats {
        CircuitStats {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            last_failure_at: self.last_failure_at,
            opened_at: self.opened_at,
            probes_in_flight: self.probes_in_flight,
        }
    }

    pub(crate) fn retry_after(
        &self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> Option<Duration> {
        match (self.state, self.opened_at) {
            (CircuitState::Open, Some(opened_at)) => {
                Some(config.cooldown.saturating_sub(now.saturating_duration_since(opened_at)))
            }
            _ => None,
        }
    }

    pub(crate) fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> Result<(), CircuitBreakerError> {
        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = self
                    .opened_at
                    .map_or(true, |at| now.saturating_duration_since(at) >= config.cooldown);
                if cooled {
                    self.transition_to(CircuitState::HalfOpen, config, now);
                    self.probes_in_flight = 1;
                }
                cooled
            }
            CircuitState::HalfOpen => {
                if self.probes_in_flight < config.half_open_max_probes {
                    self.probes_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    pattern_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    state: self.state,
                });
            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "permitted").increment(1);
            return Ok(());
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            breaker = %config.name,
            state = self.state.as_str(),
            "call rejected"
        );

        Err(CircuitBreakerError {
            name: config.name.clone(),
            retry_after: self.retry_after(config, now).unwrap_or_default(),
            consecutive_failures: self.consecutive_failures,
        })
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        match self.state {
            CircuitState::Closed => self.consecutive_failures = 0,
            CircuitState::HalfOpen => self.transition_to(CircuitState::Closed, config, now),
            // a straggler admitted before the trip says nothing about recovery
            CircuitState::Open => {}
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(now);

        match self.state {
            CircuitState::Closed => {
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config, now);
                }
            }
            // any probe failure reopens, even with other probes outstanding
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config, now),
            CircuitState::Open => {}
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                consecutive_failures: self.consecutive_failures,
            });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);
    }

    pub(crate) fn release_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.transition_to(CircuitState::Open, config, now);
        // re-stamp even if already open so the cooldown restarts
        self.opened_at = Some(now);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.transition_to(CircuitState::Closed, config, now);
        self.consecutive_failures = 0;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig, now: Instant) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        match state {
            CircuitState::Open => tracing::warn!(
                breaker = %config.name,
                from = from_state.as_str(),
                consecutive_failures = self.consecutive_failures,
                "circuit opened"
            ),
            _ => tracing::info!(
                breaker = %config.name,
                from = from_state.as_str(),
                to = state.as_str(),
                "circuit state transition"
            ),
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.probes_in_flight = 0;
        match state {
            CircuitState::Open => self.opened_at = Some(now),
            CircuitState::Closed => {
                self.consecutive_failures = 0;
                self.opened_at = None;
            }
            CircuitState::HalfOpen => {}
        }
    }
}
