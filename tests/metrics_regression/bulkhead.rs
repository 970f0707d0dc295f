//! Concurrency limiter metrics regression tests

use super::helpers::*;
use outbound_resilience_bulkhead::{ConcurrencyLimiter, LimiterConfig};
use outbound_resilience_core::RequestContext;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn bulkhead_metrics() {
    init_recorder();

    let limiter = ConcurrencyLimiter::new(LimiterConfig {
        name: "metrics_limiter".to_string(),
        max_concurrent: 1,
        max_wait: Some(Duration::from_millis(10)),
        ..Default::default()
    })
    .unwrap();

    let ctx = RequestContext::new();
    let permit = limiter.acquire(&ctx).await.unwrap();
    assert!(limiter.acquire(&ctx).await.is_err());
    drop(permit);

    assert_counter_exists("bulkhead_calls_permitted_total");
    assert_metric_has_label("bulkhead_calls_permitted_total", "bulkhead", "metrics_limiter");
    assert_counter_exists("bulkhead_calls_rejected_total");
    assert_metric_has_label("bulkhead_calls_rejected_total", "bulkhead", "metrics_limiter");
    assert_gauge_exists("bulkhead_concurrent_calls");
}
