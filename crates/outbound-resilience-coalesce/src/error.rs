use outbound_resilience_core::{CancelCause, ResilienceError};

/// Error returned by [`RequestDeduplicator::run`](crate::RequestDeduplicator::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoalesceError<E> {
    /// This caller's context was cancelled or its deadline passed while
    /// waiting. The shared execution keeps running for everyone else.
    Canceled(CancelCause),
    /// The shared execution ended without a result (it panicked).
    Aborted,
    /// The fetch function returned an error; every waiter gets a clone.
    Upstream(E),
}

impl<E> CoalesceError<E> {
    /// Returns the fetch error if present.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            CoalesceError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for CoalesceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoalesceError::Canceled(cause) => write!(f, "waiting for shared result: {}", cause),
            CoalesceError::Aborted => write!(f, "shared execution aborted before completing"),
            CoalesceError::Upstream(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CoalesceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoalesceError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<CoalesceError<ResilienceError<E>>> for ResilienceError<E> {
    fn from(err: CoalesceError<ResilienceError<E>>) -> Self {
        match err {
            CoalesceError::Canceled(cause) => ResilienceError::Canceled { cause },
            CoalesceError::Aborted => ResilienceError::Aborted,
            CoalesceError::Upstream(e) => e,
        }
    }
}
