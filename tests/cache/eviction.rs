use outbound_resilience_cache::{Cache, CacheConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
async fn least_recently_used_entry_is_evicted() {
    let evictions = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&evictions);
    let cache: Cache<&'static str, u32> = Cache::new(
        CacheConfig {
            capacity: 2,
            sweep_interval: None,
            ..Default::default()
        }
        .on_eviction(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    cache.set("a", 1, TTL);
    cache.set("b", 2, TTL);
    // touching "a" makes "b" the eviction candidate
    assert_eq!(cache.get(&"a"), Some(1));
    cache.set("c", 3, TTL);

    assert_eq!(cache.get(&"b"), None);
    assert_eq!(cache.get(&"a"), Some(1));
    assert_eq!(cache.get(&"c"), Some(3));
    assert_eq!(evictions.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entries_go_before_live_ones() {
    let cache: Cache<&'static str, u32> = Cache::new(CacheConfig {
        capacity: 2,
        sweep_interval: None,
        ..Default::default()
    })
    .unwrap();

    cache.set("live", 1, TTL);
    cache.set("short", 2, Duration::from_secs(1));
    tokio::time::advance(Duration::from_secs(2)).await;

    // "live" is least recently used, but "short" has expired
    cache.set("new", 3, TTL);

    assert_eq!(cache.get(&"live"), Some(1));
    assert_eq!(cache.get(&"new"), Some(3));
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test]
async fn overwriting_at_capacity_does_not_evict() {
    let cache: Cache<u32, u32> = Cache::new(CacheConfig {
        capacity: 3,
        sweep_interval: None,
        ..Default::default()
    })
    .unwrap();

    for i in 0..3 {
        cache.set(i, i, TTL);
    }
    cache.set(0, 100, TTL);

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get(&0), Some(100));
    assert_eq!(cache.stats().evictions, 0);
}
