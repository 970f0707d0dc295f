//! Error taxonomy for the outbound resilience layer.
//!
//! [`ResilienceError<E>`] is the one error type a caller of the resilient
//! client sees. Locally generated rejections (open circuit, guard, limiter,
//! cancellation) each have their own variant so a caller can decide to retry
//! later, fall back, or fail; the upstream's own error is passed through
//! untouched in [`ResilienceError::Upstream`].
//!
//! ```rust
//! use outbound_resilience_core::{GuardReason, ResilienceError};
//!
//! fn describe(err: &ResilienceError<std::io::Error>) -> &'static str {
//!     match err {
//!         ResilienceError::CircuitOpen { .. } => "upstream is failing, try later",
//!         ResilienceError::GuardRejected { reason: GuardReason::DnsFailure, .. } => "dns",
//!         ResilienceError::GuardRejected { .. } => "destination not allowed",
//!         ResilienceError::Upstream(_) => "upstream error",
//!         _ => "other",
//!     }
//! }
//! ```

use crate::context::CancelCause;
use std::fmt;
use std::time::Duration;

/// Why the connect guard refused a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardReason {
    /// The resolved address is loopback, private, link-local, reserved or
    /// otherwise blocked by the address policy.
    PrivateDestination,
    /// Name resolution failed or produced no usable address.
    DnsFailure,
    /// A redirect pointed at a disallowed destination.
    RedirectBlocked,
    /// The URL could not be used (bad scheme, missing host, unparsable).
    MalformedUrl,
}

impl GuardReason {
    /// Stable snake_case label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardReason::PrivateDestination => "private_destination",
            GuardReason::DnsFailure => "dns_failure",
            GuardReason::RedirectBlocked => "redirect_blocked",
            GuardReason::MalformedUrl => "malformed_url",
        }
    }
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the resilient client.
///
/// `E` is the upstream (fetch function) error type.
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// The circuit breaker rejected the call without reaching the upstream.
    CircuitOpen {
        /// Breaker instance name.
        name: String,
        /// Estimated time until the breaker admits a probe.
        retry_after: Duration,
        /// Consecutive failures recorded when the call was rejected.
        consecutive_failures: u32,
    },

    /// The connect guard refused the destination.
    GuardRejected {
        /// Reason code.
        reason: GuardReason,
        /// Human-readable detail (host, address, matched range).
        detail: String,
    },

    /// Waiting for a concurrency permit was cancelled.
    LimiterCanceled {
        /// The caller's cancellation cause.
        cause: CancelCause,
    },

    /// Waiting for a shared in-flight result was cancelled.
    Canceled {
        /// The caller's cancellation cause.
        cause: CancelCause,
    },

    /// A bounded wait elapsed (limiter admission or the request timeout).
    Timeout {
        /// The stage that timed out, e.g. `"request"` or `"limiter"`.
        layer: &'static str,
    },

    /// The shared execution ended without producing a result (it panicked).
    Aborted,

    /// The upstream fetch failed; the error is passed through unchanged.
    Upstream(E),
}

impl<E> fmt::Display for ResilienceError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::CircuitOpen {
                name,
                retry_after,
                consecutive_failures,
            } => write!(
                f,
                "circuit breaker '{}' is open after {} consecutive failures, retry after {:?}",
                name, consecutive_failures, retry_after
            ),
            ResilienceError::GuardRejected { reason, detail } => {
                write!(f, "destination rejected ({}): {}", reason, detail)
            }
            ResilienceError::LimiterCanceled { cause } => {
                write!(f, "waiting for a concurrency permit: {}", cause)
            }
            ResilienceError::Canceled { cause } => write!(f, "request {}", cause),
            ResilienceError::Timeout { layer } => write!(f, "timeout in {}", layer),
            ResilienceError::Aborted => write!(f, "shared request aborted before completing"),
            ResilienceError::Upstream(e) => write!(f, "upstream error: {}", e),
        }
    }
}

impl<E> std::error::Error for ResilienceError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResilienceError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> ResilienceError<E> {
    /// Returns `true` if the circuit breaker rejected the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if the connect guard rejected the destination.
    pub fn is_guard_rejected(&self) -> bool {
        matches!(self, ResilienceError::GuardRejected { .. })
    }

    /// Returns `true` for caller cancellation (limiter wait or shared wait).
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            ResilienceError::LimiterCanceled { .. } | ResilienceError::Canceled { .. }
        )
    }

    /// Returns `true` if a bounded wait elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// Returns `true` if the upstream itself failed.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ResilienceError::Upstream(_))
    }

    /// Returns `true` if the error was produced by this layer rather than the
    /// upstream.
    pub fn is_local(&self) -> bool {
        !self.is_upstream()
    }

    /// Returns `true` if the failure says something about upstream health and
    /// should count against the circuit breaker.
    pub fn counts_as_failure(&self) -> bool {
        matches!(
            self,
            ResilienceError::Upstream(_) | ResilienceError::Timeout { .. } | ResilienceError::Aborted
        )
    }

    /// The guard reason, if this is a guard rejection.
    pub fn guard_reason(&self) -> Option<GuardReason> {
        match self {
            ResilienceError::GuardRejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// How long to wait before retrying, if the layer knows.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ResilienceError::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Borrows the upstream error, if any.
    pub fn upstream(&self) -> Option<&E> {
        match self {
            ResilienceError::Upstream(e) => Some(e),
            _ => None,
        }
    }

    /// Extracts the upstream error, if any.
    pub fn upstream_error(self) -> Option<E> {
        match self {
            ResilienceError::Upstream(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the upstream error, leaving local variants untouched.
    ///
    /// ```
    /// use outbound_resilience_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Upstream("boom".to_string());
    /// let mapped: ResilienceError<usize> = err.map_upstream(|s| s.len());
    /// assert_eq!(mapped.upstream_error(), Some(4));
    /// ```
    pub fn map_upstream<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::CircuitOpen {
                name,
                retry_after,
                consecutive_failures,
            } => ResilienceError::CircuitOpen {
                name,
                retry_after,
                consecutive_failures,
            },
            ResilienceError::GuardRejected { reason, detail } => {
                ResilienceError::GuardRejected { reason, detail }
            }
            ResilienceError::LimiterCanceled { cause } => ResilienceError::LimiterCanceled { cause },
            ResilienceError::Canceled { cause } => ResilienceError::Canceled { cause },
            ResilienceError::Timeout { layer } => ResilienceError::Timeout { layer },
            ResilienceError::Aborted => ResilienceError::Aborted,
            ResilienceError::Upstream(e) => ResilienceError::Upstream(f(e)),
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A field is out of range.
    #[error("{component}: `{field}` {reason}")]
    Invalid {
        /// Component being configured.
        component: &'static str,
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An address range could not be parsed.
    #[error("invalid address range `{0}`")]
    InvalidRange(String),

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The HTTP transport could not be constructed.
    #[error("failed to build http transport: {0}")]
    Transport(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(component: &'static str, field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid {
            component,
            field,
            reason,
        }
    }
}
