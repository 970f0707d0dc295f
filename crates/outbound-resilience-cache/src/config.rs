//! Configuration for the cache.

use crate::events::CacheEvent;
use outbound_resilience_core::{ConfigError, EventListeners};
use std::time::Duration;

/// Configuration for a [`Cache`](crate::Cache).
///
/// Construct with struct-update syntax over [`CacheConfig::default`] and pass
/// the value to [`Cache::new`](crate::Cache::new), which validates it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Instance name used in events, logs and metrics.
    pub name: String,

    /// Maximum number of entries. Must be greater than zero.
    ///
    /// Default: 1000
    pub capacity: usize,

    /// TTL applied by [`Cache::insert`](crate::Cache::insert).
    ///
    /// Default: 5 minutes
    #[cfg_attr(feature = "serde", serde(with = "outbound_resilience_core::duration_ms"))]
    pub default_ttl: Duration,

    /// How often the background task purges expired entries. `None` disables
    /// the task; expired entries are then only purged on lookup and when the
    /// cache is full.
    ///
    /// Default: 60 seconds
    #[cfg_attr(
        feature = "serde",
        serde(with = "outbound_resilience_core::duration_ms::option")
    )]
    pub sweep_interval: Option<Duration>,

    /// Observers for cache events.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub event_listeners: EventListeners<CacheEvent>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: String::from("cache"),
            capacity: 1000,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Some(Duration::from_secs(60)),
            event_listeners: EventListeners::new(),
        }
    }
}

impl CacheConfig {
    /// Checks the values a cache cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid(
                "cache",
                "capacity",
                "must be greater than zero",
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(ConfigError::invalid(
                "cache",
                "default_ttl",
                "must be greater than zero",
            ));
        }
        if self.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::invalid(
                "cache",
                "sweep_interval",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// Registers a callback invoked on every cache hit.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if matches!(event, CacheEvent::Hit { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked on every cache miss.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if matches!(event, CacheEvent::Miss { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked when a live entry is evicted for capacity.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if matches!(event, CacheEvent::Eviction { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked with the number of expired entries purged.
    pub fn on_expired<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add_fn(move |event| {
            if let CacheEvent::Expired { count, .. } = event {
                f(*count);
            }
        });
        self
    }
}
