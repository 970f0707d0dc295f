//! Property tests for cache capacity and freshness.

use outbound_resilience_cache::{Cache, CacheConfig};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// The cache never holds more than its capacity, and a value just
    /// written is always readable.
    #[test]
    fn bounded_and_read_your_writes(
        capacity in 1usize..16,
        writes in prop::collection::vec((0u8..32, any::<u32>()), 1..200),
    ) {
        let cache: Cache<u8, u32> = Cache::new(CacheConfig {
            capacity,
            sweep_interval: None,
            ..Default::default()
        })
        .unwrap();

        for (key, value) in writes {
            cache.set(key, value, Duration::from_secs(60));
            prop_assert_eq!(cache.get(&key), Some(value));
            prop_assert!(cache.len() <= capacity);
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.size, cache.len());
    }
}
