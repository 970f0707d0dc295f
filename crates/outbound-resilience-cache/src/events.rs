//! Event types for the cache.

use outbound_resilience_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a [`Cache`](crate::Cache).
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A live entry was found.
    Hit {
        /// The name of the cache instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// No live entry was found.
    Miss {
        /// The name of the cache instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A live entry was evicted to make room for a new key.
    Eviction {
        /// The name of the cache instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// Expired entries were purged, lazily or by the sweep.
    Expired {
        /// The name of the cache instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How many entries were removed.
        count: usize,
    },
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "cache_hit",
            CacheEvent::Miss { .. } => "cache_miss",
            CacheEvent::Eviction { .. } => "cache_eviction",
            CacheEvent::Expired { .. } => "cache_expired",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Expired { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { pattern_name, .. }
            | CacheEvent::Miss { pattern_name, .. }
            | CacheEvent::Eviction { pattern_name, .. }
            | CacheEvent::Expired { pattern_name, .. } => pattern_name,
        }
    }
}
