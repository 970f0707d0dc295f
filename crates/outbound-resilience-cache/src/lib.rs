//! Bounded, time-expiring cache for upstream responses.
//!
//! Entries carry their own TTL and are never returned once expired. The
//! cache holds at most `capacity` entries; inserting a new key into a full
//! cache first purges expired entries and, if that frees nothing, evicts the
//! least recently used entry. A background task purges expired entries every
//! `sweep_interval` until [`Cache::close`] is called or the last handle is
//! dropped.
//!
//! # Example
//!
//! ```rust
//! use outbound_resilience_cache::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: Cache<String, u64> = Cache::new(CacheConfig {
//!     name: "company-lookup".into(),
//!     capacity: 500,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! cache.set("org:123".to_string(), 42, Duration::from_secs(60));
//! assert_eq!(cache.get(&"org:123".to_string()), Some(42));
//!
//! cache.close();
//! assert_eq!(cache.get(&"org:123".to_string()), None);
//! # }
//! ```
//!
//! # Events
//!
//! ```rust
//! use outbound_resilience_cache::CacheConfig;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = Arc::clone(&hits);
//! let config = CacheConfig::default().on_hit(move || {
//!     h.fetch_add(1, Ordering::Relaxed);
//! });
//! # let _ = config;
//! ```

mod config;
mod events;
mod store;

pub use config::CacheConfig;
pub use events::CacheEvent;

use outbound_resilience_core::{ConfigError, EventListeners};
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use store::{Lookup, TtlLruStore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "cache_requests_total",
            "Total number of cache requests (hits and misses)"
        );
        describe_counter!("cache_evictions_total", "Total number of cache evictions");
        describe_counter!(
            "cache_expirations_total",
            "Total number of expired entries removed"
        );
        describe_gauge!("cache_size", "Current number of entries in the cache");
    });
}

/// Point-in-time counters for a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups that returned a value.
    pub hits: u64,
    /// Lookups that returned nothing (absent, expired or closed).
    pub misses: u64,
    /// Live entries evicted for capacity.
    pub evictions: u64,
    /// Expired entries removed, lazily or by the sweep.
    pub expirations: u64,
    /// Entries currently stored.
    pub size: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

struct Shared<K, V> {
    name: String,
    default_ttl: Duration,
    /// `None` once closed.
    store: Mutex<Option<TtlLruStore<K, V>>>,
    counters: Counters,
    listeners: EventListeners<CacheEvent>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Drop for Shared<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A bounded TTL + LRU cache.
///
/// Cloning is cheap; clones share the same entries.
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache from a validated configuration.
    ///
    /// When called inside a tokio runtime and `sweep_interval` is set, the
    /// background sweep is spawned on that runtime. Outside a runtime expired
    /// entries are still purged on lookup and when the cache is full.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.capacity).ok_or_else(|| {
            ConfigError::invalid("cache", "capacity", "must be greater than zero")
        })?;

        #[cfg(feature = "metrics")]
        describe_metrics();

        let shared = Arc::new(Shared {
            name: config.name,
            default_ttl: config.default_ttl,
            store: Mutex::new(Some(TtlLruStore::new(capacity))),
            counters: Counters::default(),
            listeners: config.event_listeners,
            shutdown: CancellationToken::new(),
            sweeper: Mutex::new(None),
        });

        if let Some(every) = config.sweep_interval {
            let handle = spawn_sweeper(&shared, every);
            *shared.sweeper.lock() = handle;
        }

        Ok(Self { shared })
    }

    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry is removed. A hit makes the entry most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let (lookup, size) = {
            let mut guard = self.shared.store.lock();
            match guard.as_mut() {
                Some(store) => {
                    let lookup = store.get(key, now);
                    (lookup, store.len())
                }
                None => (Lookup::Miss, 0),
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                self.shared.counters.hits.fetch_add(1, Ordering::Relaxed);
                self.shared.record_hit();
                Some(value)
            }
            Lookup::Expired => {
                self.shared.record_expired(1, size);
                self.shared.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.shared.record_miss();
                None
            }
            Lookup::Miss => {
                self.shared.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.shared.record_miss();
                None
            }
        }
    }

    /// Stores `value` under `key` for `ttl`, overwriting any previous entry.
    ///
    /// A zero `ttl` stores nothing and drops any existing entry for `key`.
    /// After [`close`](Self::close) this is a no-op.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let (outcome, size) = {
            let mut guard = self.shared.store.lock();
            let Some(store) = guard.as_mut() else {
                return;
            };
            if ttl.is_zero() {
                store.remove(&key, now);
                return;
            }
            let outcome = store.set(key, value, now.checked_add(ttl), now);
            (outcome, store.len())
        };

        if outcome.expired > 0 {
            self.shared.record_expired(outcome.expired, size);
        }
        if outcome.evicted {
            self.shared.record_eviction();
        }

        #[cfg(feature = "metrics")]
        gauge!("cache_size", "cache" => self.shared.name.clone()).set(size as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = size;
    }

    /// Stores `value` under `key` with the configured default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.shared.default_ttl);
    }

    /// Removes `key`, returning its value if it was still live.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.shared
            .store
            .lock()
            .as_mut()
            .and_then(|store| store.remove(key, now))
    }

    /// Removes every expired entry now and returns how many were removed.
    ///
    /// This is what the background task runs on each tick.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.shared
            .store
            .lock()
            .as_ref()
            .map_or(0, |store| store.len())
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured default TTL.
    pub fn default_ttl(&self) -> Duration {
        self.shared.default_ttl
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let counters = &self.shared.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            expirations: counters.expirations.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Stops the background sweep and drops every entry.
    ///
    /// Idempotent, and safe to call while other tasks use the cache.
    pub fn close(&self) {
        self.shared.shutdown.cancel();
        let dropped = self.shared.store.lock().take();
        // the task observes the token on its own; the handle only detaches
        drop(self.shared.sweeper.lock().take());

        #[cfg(feature = "tracing")]
        if let Some(store) = &dropped {
            debug!(cache = %self.shared.name, entries = store.len(), "cache closed");
        }
        drop(dropped);
    }
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let (removed, size) = {
            let mut guard = self.store.lock();
            match guard.as_mut() {
                Some(store) => (store.purge_expired(now), store.len()),
                None => return 0,
            }
        };
        if removed > 0 {
            self.record_expired(removed, size);
        }
        removed
    }

    fn record_hit(&self) {
        #[cfg(feature = "metrics")]
        counter!("cache_requests_total", "cache" => self.name.clone(), "result" => "hit")
            .increment(1);

        #[cfg(feature = "tracing")]
        trace!(cache = %self.name, "cache hit");

        if !self.listeners.is_empty() {
            self.listeners.emit(&CacheEvent::Hit {
                pattern_name: self.name.clone(),
                timestamp: std::time::Instant::now(),
            });
        }
    }

    fn record_miss(&self) {
        #[cfg(feature = "metrics")]
        counter!("cache_requests_total", "cache" => self.name.clone(), "result" => "miss")
            .increment(1);

        #[cfg(feature = "tracing")]
        trace!(cache = %self.name, "cache miss");

        if !self.listeners.is_empty() {
            self.listeners.emit(&CacheEvent::Miss {
                pattern_name: self.name.clone(),
                timestamp: std::time::Instant::now(),
            });
        }
    }

    fn record_eviction(&self) {
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        counter!("cache_evictions_total", "cache" => self.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        debug!(cache = %self.name, "evicted least recently used entry");

        if !self.listeners.is_empty() {
            self.listeners.emit(&CacheEvent::Eviction {
                pattern_name: self.name.clone(),
                timestamp: std::time::Instant::now(),
            });
        }
    }

    fn record_expired(&self, count: usize, size: usize) {
        self.counters
            .expirations
            .fetch_add(count as u64, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        {
            counter!("cache_expirations_total", "cache" => self.name.clone())
                .increment(count as u64);
            gauge!("cache_size", "cache" => self.name.clone()).set(size as f64);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = size;

        #[cfg(feature = "tracing")]
        trace!(cache = %self.name, count, "purged expired entries");

        if !self.listeners.is_empty() {
            self.listeners.emit(&CacheEvent::Expired {
                pattern_name: self.name.clone(),
                timestamp: std::time::Instant::now(),
                count,
            });
        }
    }
}

/// Spawns the periodic sweep on the current runtime, if there is one.
///
/// The task only holds a weak reference, so it never keeps the cache alive.
fn spawn_sweeper<K, V>(shared: &Arc<Shared<K, V>>, every: Duration) -> Option<JoinHandle<()>>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        #[cfg(feature = "tracing")]
        debug!(
            cache = %shared.name,
            "no tokio runtime; expired entries are purged lazily only"
        );
        return None;
    };

    let weak: Weak<Shared<K, V>> = Arc::downgrade(shared);
    let shutdown = shared.shutdown.clone();

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(shared) = weak.upgrade() else { break };
                    shared.sweep();
                }
            }
        }
    }))
}
