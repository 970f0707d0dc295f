//! Guard and transport errors.

use outbound_resilience_core::{GuardReason, ResilienceError};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// A destination refused by the guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {detail}")]
pub struct GuardError {
    pub reason: GuardReason,
    /// Host, address and matched range, for logs and error messages.
    pub detail: String,
}

impl GuardError {
    pub fn new(reason: GuardReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// Re-labels a rejection found while following a redirect. Malformed
    /// targets keep their reason.
    pub(crate) fn into_redirect(self, target: &url::Url) -> Self {
        match self.reason {
            GuardReason::MalformedUrl => self,
            _ => GuardError::new(
                GuardReason::RedirectBlocked,
                format!("redirect to {}: {}", target, self.detail),
            ),
        }
    }

    /// Logs and counts the rejection.
    pub(crate) fn record(self) -> Self {
        #[cfg(feature = "tracing")]
        tracing::warn!(reason = self.reason.as_str(), detail = %self.detail, "destination rejected");

        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "guard_rejections_total",
                    "Outbound destinations refused by the connect guard"
                );
            });
            counter!("guard_rejections_total", "reason" => self.reason.as_str()).increment(1);
        }

        self
    }

    /// Finds a guard rejection anywhere in an error's source chain.
    ///
    /// reqwest wraps resolver and redirect-policy errors, so the original
    /// [`GuardError`] sits a few levels down.
    pub fn find_in<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a GuardError> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(e) = current {
            if let Some(guard) = e.downcast_ref::<GuardError>() {
                return Some(guard);
            }
            current = e.source();
        }
        None
    }
}

impl<E> From<GuardError> for ResilienceError<E> {
    fn from(err: GuardError) -> Self {
        ResilienceError::GuardRejected {
            reason: err.reason,
            detail: err.detail,
        }
    }
}

/// Error from a [`GuardedClient`](crate::GuardedClient) call.
///
/// Cheap to clone so a single result can be shared between deduplicated
/// callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    /// The guard refused the destination, directly or at connect time.
    #[error("destination rejected: {0}")]
    Guard(#[from] GuardError),

    /// Connecting, sending, or reading the response failed.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The upstream answered with a non-success status.
    #[error("upstream returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] Arc<reqwest::Error>),
}

impl HttpError {
    /// Classifies a reqwest error, recovering guard rejections from its
    /// source chain.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(guard) = GuardError::find_in(&err) {
            return HttpError::Guard(guard.clone());
        }
        if err.is_decode() {
            return HttpError::Decode(Arc::new(err));
        }
        HttpError::Transport(Arc::new(err))
    }

    pub fn is_guard_rejected(&self) -> bool {
        matches!(self, HttpError::Guard(_))
    }

    /// The guard rejection, if this is one.
    pub fn guard_error(&self) -> Option<&GuardError> {
        match self {
            HttpError::Guard(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the transport timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Transport(err) if err.is_timeout())
    }

    /// The upstream status, for [`HttpError::Status`].
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::from_reqwest(err)
    }
}

/// Guard rejections stay local; everything else is the upstream's error.
impl From<HttpError> for ResilienceError<HttpError> {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Guard(guard) => guard.into(),
            other => ResilienceError::Upstream(other),
        }
    }
}
