//! Error types for the concurrency limiter.

use outbound_resilience_core::{CancelCause, ResilienceError};
use std::time::Duration;

/// Why [`ConcurrencyLimiter::acquire`](crate::ConcurrencyLimiter::acquire)
/// returned without a permit. None of these consume a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LimiterError {
    /// The caller's context was cancelled or its deadline passed.
    #[error("waiting for a concurrency permit: {0}")]
    Canceled(CancelCause),
    /// `max_wait` elapsed without a free slot.
    #[error("timeout after {max_wait:?} waiting for a concurrency permit")]
    Timeout {
        /// The configured bound.
        max_wait: Duration,
    },
    /// The limiter was closed.
    #[error("concurrency limiter is closed")]
    Closed,
}

impl<E> From<LimiterError> for ResilienceError<E> {
    fn from(err: LimiterError) -> Self {
        match err {
            LimiterError::Canceled(cause) => ResilienceError::LimiterCanceled { cause },
            LimiterError::Timeout { .. } => ResilienceError::Timeout { layer: "limiter" },
            // shutdown surfaces like a cancellation of the wait
            LimiterError::Closed => ResilienceError::LimiterCanceled {
                cause: CancelCause::Canceled,
            },
        }
    }
}
