use outbound_resilience_core::ResilienceError;
use std::time::Duration;
use thiserror::Error;

/// Returned by [`CircuitBreaker::try_acquire`](crate::CircuitBreaker::try_acquire)
/// when the call is not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{name}' is open; retry after {retry_after:?}")]
pub struct CircuitBreakerError {
    /// Breaker instance name.
    pub name: String,
    /// Remaining cooldown, or zero while half-open probes are outstanding.
    pub retry_after: Duration,
    /// Consecutive failures at the time of rejection.
    pub consecutive_failures: u32,
}

impl<E> From<CircuitBreakerError> for ResilienceError<E> {
    fn from(err: CircuitBreakerError) -> Self {
        ResilienceError::CircuitOpen {
            name: err.name,
            retry_after: err.retry_after,
            consecutive_failures: err.consecutive_failures,
        }
    }
}
