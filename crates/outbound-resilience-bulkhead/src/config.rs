use crate::events::LimiterEvent;
use outbound_resilience_core::{ConfigError, EventListeners};
use std::time::Duration;

/// Configuration for a [`ConcurrencyLimiter`](crate::ConcurrencyLimiter).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LimiterConfig {
    /// Instance name used in events, logs and metrics.
    pub name: String,

    /// Maximum permits held at once. At least 1.
    ///
    /// Default: 10
    pub max_concurrent: usize,

    /// Upper bound on how long `acquire` waits. `None` waits until a slot
    /// frees or the caller's context is done.
    ///
    /// Default: `None`
    #[cfg_attr(
        feature = "serde",
        serde(with = "outbound_resilience_core::duration_ms::option")
    )]
    pub max_wait: Option<Duration>,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub event_listeners: EventListeners<LimiterEvent>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            name: String::from("limiter"),
            max_concurrent: 10,
            max_wait: None,
            event_listeners: EventListeners::new(),
        }
    }
}

impl LimiterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::invalid(
                "limiter",
                "max_concurrent",
                "must be at least 1",
            ));
        }
        if self.max_concurrent > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(ConfigError::invalid(
                "limiter",
                "max_concurrent",
                "exceeds the semaphore permit limit",
            ));
        }
        Ok(())
    }

    /// Registers a callback invoked when a permit is granted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if let LimiterEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        });
        self
    }

    /// Registers a callback invoked when `acquire` gives up.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if matches!(event, LimiterEvent::CallRejected { .. }) {
                f();
            }
        });
        self
    }
}
