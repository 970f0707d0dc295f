use outbound_resilience_cache::{Cache, CacheConfig};
use std::time::Duration;

fn cache(capacity: usize) -> Cache<String, u32> {
    Cache::new(CacheConfig {
        capacity,
        sweep_interval: None,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn value_round_trips_until_ttl() {
    let cache = cache(10);
    cache.set("org/123".to_string(), 7, Duration::from_secs(60));

    assert_eq!(cache.get(&"org/123".to_string()), Some(7));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(cache.get(&"org/123".to_string()), Some(7));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get(&"org/123".to_string()), None);
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.stats().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn overwrite_restarts_ttl() {
    let cache = cache(10);
    cache.set("k".to_string(), 1, Duration::from_secs(10));
    tokio::time::advance(Duration::from_secs(8)).await;
    cache.set("k".to_string(), 2, Duration::from_secs(10));
    tokio::time::advance(Duration::from_secs(8)).await;

    assert_eq!(cache.get(&"k".to_string()), Some(2));
}

#[tokio::test(start_paused = true)]
async fn background_sweep_purges_without_lookups() {
    let cache: Cache<String, u32> = Cache::new(CacheConfig {
        capacity: 10,
        sweep_interval: Some(Duration::from_secs(1)),
        ..Default::default()
    })
    .unwrap();

    for i in 0..5 {
        cache.set(format!("k{}", i), i, Duration::from_millis(500));
    }
    assert_eq!(cache.len(), 5);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.stats().expirations, 5);
}
