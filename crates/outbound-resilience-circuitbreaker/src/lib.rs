//! Consecutive-failure circuit breaker.
//!
//! The breaker isolates a failing upstream so callers fail fast instead of
//! waiting on a dependency that is down, while still testing periodically
//! whether it has recovered.
//!
//! ## States
//!
//! - **Closed**: every call is admitted. Each recorded failure increments a
//!   consecutive-failure counter; a success resets it. Reaching
//!   `failure_threshold` opens the circuit.
//! - **Open**: calls are rejected until `cooldown` has elapsed since the
//!   circuit opened. The first call after that moves the circuit to half-open
//!   and is admitted as a probe.
//! - **HalfOpen**: at most `half_open_max_probes` probes are outstanding. A
//!   probe success closes the circuit; a probe failure reopens it immediately,
//!   even while another probe is still outstanding, and restarts the cooldown.
//!
//! All transitions happen under one lock, so concurrent callers observe a
//! single linear history. [`CircuitBreaker::state`] reads an atomic mirror and
//! never takes the lock.
//!
//! ## Usage
//!
//! The breaker does not run calls itself. Ask it for admission, run the call,
//! then report the outcome:
//!
//! ```rust
//! use outbound_resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig {
//!     name: "registry".into(),
//!     failure_threshold: 5,
//!     cooldown: Duration::from_secs(30),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! for _ in 0..5 {
//!     assert!(breaker.allow());
//!     breaker.record_failure();
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(!breaker.allow());
//! ```
//!
//! A call that was admitted but ended without an outcome that says anything
//! about upstream health (cancelled by the caller, rejected locally) should
//! call [`CircuitBreaker::release_probe`] so a half-open probe slot is not
//! held forever.
//!
//! ## Event listeners
//!
//! ```rust
//! use outbound_resilience_circuitbreaker::CircuitBreakerConfig;
//!
//! let config = CircuitBreakerConfig::default()
//!     .on_state_transition(|from, to| println!("{:?} -> {:?}", from, to))
//!     .on_call_rejected(|| println!("rejected"));
//! # let _ = config;
//! ```

mod circuit;
mod config;
mod error;
mod events;

pub use circuit::{CircuitState, CircuitStats};
pub use config::CircuitBreakerConfig;
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

use circuit::Circuit;
use outbound_resilience_core::ConfigError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Calls through the circuit breaker by outcome (permitted, rejected, success, failure)"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state (0 = closed, 1 = open, 2 = half-open)"
        );
    });
}

struct Inner {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
    state_atomic: Arc<AtomicU8>,
}

/// A shared circuit breaker.
///
/// Cloning is cheap; clones observe and drive the same circuit.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker from a validated configuration.
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        #[cfg(feature = "metrics")]
        describe_metrics();

        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Ok(Self {
            inner: Arc::new(Inner {
                circuit: Mutex::new(Circuit::new(Arc::clone(&state_atomic))),
                config,
                state_atomic,
            }),
        })
    }

    /// Returns true if a call may proceed now.
    ///
    /// In the open state this is where the cooldown is checked and the
    /// transition to half-open happens. An admitted half-open call occupies a
    /// probe slot until it records an outcome or calls
    /// [`release_probe`](Self::release_probe).
    pub fn allow(&self) -> bool {
        self.try_acquire().is_ok()
    }

    /// Like [`allow`](Self::allow), but a rejection carries the breaker name,
    /// the remaining cooldown and the failure count.
    pub fn try_acquire(&self) -> Result<(), CircuitBreakerError> {
        self.inner
            .circuit
            .lock()
            .try_acquire(&self.inner.config, Instant::now())
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        self.inner
            .circuit
            .lock()
            .record_success(&self.inner.config, Instant::now());
    }

    /// Records a failed call.
    pub fn record_failure(&self) {
        self.inner
            .circuit
            .lock()
            .record_failure(&self.inner.config, Instant::now());
    }

    /// Frees the half-open probe slot of an admitted call that ended without
    /// a success or failure worth recording. No effect in other states.
    pub fn release_probe(&self) {
        self.inner.circuit.lock().release_probe();
    }

    /// Current state, read without locking.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.inner.state_atomic.load(Ordering::Acquire))
    }

    /// Consistent snapshot of the counters.
    pub fn stats(&self) -> CircuitStats {
        self.inner.circuit.lock().stats()
    }

    /// Remaining cooldown while open; `None` in other states.
    pub fn retry_after(&self) -> Option<Duration> {
        self.inner
            .circuit
            .lock()
            .retry_after(&self.inner.config, Instant::now())
    }

    /// Opens the circuit and restarts the cooldown.
    pub fn force_open(&self) {
        self.inner
            .circuit
            .lock()
            .force_open(&self.inner.config, Instant::now());
    }

    /// Closes the circuit and clears the failure count.
    pub fn force_closed(&self) {
        self.inner
            .circuit
            .lock()
            .force_closed(&self.inner.config, Instant::now());
    }

    /// Same as [`force_closed`](Self::force_closed).
    pub fn reset(&self) {
        self.force_closed();
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.inner.config.name)
            .field("state", &self.state())
            .finish()
    }
}
