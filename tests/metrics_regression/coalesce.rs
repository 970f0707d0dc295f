//! Request deduplication metrics regression tests

use super::helpers::*;
use outbound_resilience_coalesce::RequestDeduplicator;
use outbound_resilience_core::RequestContext;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn coalesce_metrics() {
    init_recorder();

    let dedup: RequestDeduplicator<String, u32, String> = RequestDeduplicator::new("metrics_coalesce");
    let ctx = RequestContext::new();

    let (first, second) = tokio::join!(
        dedup.run(&ctx, "company/1".to_string(), || async {
            tokio::task::yield_now().await;
            Ok::<_, String>(1)
        }),
        dedup.run(&ctx, "company/1".to_string(), || async { Ok::<_, String>(2) }),
    );
    assert_eq!(first.unwrap().into_value(), 1);
    assert_eq!(second.unwrap().into_value(), 1);

    assert_counter_exists("coalesce_requests_total");
    assert_metric_has_label("coalesce_requests_total", "coalesce", "metrics_coalesce");
    assert_metric_has_label("coalesce_requests_total", "role", "leader");
    assert_metric_has_label("coalesce_requests_total", "role", "follower");
    assert_gauge_exists("coalesce_in_flight");
}
