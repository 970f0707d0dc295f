//! TTL-aware LRU storage.
//!
//! The store itself is not synchronized and never reads the clock; the
//! caller passes `now` so expiry decisions are made against one instant per
//! operation.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Result of a lookup.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Lookup<V> {
    Hit(V),
    Miss,
    /// The entry existed but had expired; it has been removed.
    Expired,
}

/// What a write displaced.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SetOutcome {
    pub(crate) expired: usize,
    pub(crate) evicted: bool,
}

pub(crate) struct TtlLruStore<K, V> {
    entries: LruCache<K, Entry<V>>,
    /// No entry expires before this instant. A lower bound: overwrites and
    /// removals may leave it early, and a purge makes it exact again.
    next_expiry: Option<Instant>,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlLruStore<K, V> {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            next_expiry: None,
        }
    }

    /// Looks up `key`, refreshing its recency on a hit.
    pub(crate) fn get(&mut self, key: &K, now: Instant) -> Lookup<V> {
        match self.entries.get(key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired(now) => return Lookup::Hit(entry.value.clone()),
            Some(_) => {}
        }
        self.entries.pop(key);
        Lookup::Expired
    }

    /// Inserts or overwrites `key`.
    ///
    /// A new key at capacity first purges expired entries and only evicts the
    /// least recently used live entry if that freed nothing.
    pub(crate) fn set(
        &mut self,
        key: K,
        value: V,
        expires_at: Option<Instant>,
        now: Instant,
    ) -> SetOutcome {
        let mut outcome = SetOutcome::default();

        if !self.entries.contains(&key) && self.entries.len() >= self.entries.cap().get() {
            outcome.expired = self.purge_expired(now);
            if outcome.expired == 0 {
                outcome.evicted = self.entries.pop_lru().is_some();
            }
        }

        if let Some(at) = expires_at {
            self.next_expiry = Some(self.next_expiry.map_or(at, |next| next.min(at)));
        }
        self.entries.put(key, Entry { value, expires_at });
        outcome
    }

    /// Removes `key`, returning its value if it was still live.
    pub(crate) fn remove(&mut self, key: &K, now: Instant) -> Option<V> {
        self.entries
            .pop(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    /// Removes every expired entry and returns how many were removed.
    ///
    /// Skips the scan entirely while nothing can have expired yet.
    pub(crate) fn purge_expired(&mut self, now: Instant) -> usize {
        match self.next_expiry {
            Some(next) if now >= next => {}
            _ => return 0,
        }

        let mut expired = Vec::new();
        let mut next_expiry: Option<Instant> = None;
        for (key, entry) in self.entries.iter() {
            match entry.expires_at {
                Some(at) if now >= at => expired.push(key.clone()),
                Some(at) => next_expiry = Some(next_expiry.map_or(at, |next| next.min(at))),
                None => {}
            }
        }
        for key in &expired {
            self.entries.pop(key);
        }
        self.next_expiry = next_expiry;
        expired.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
