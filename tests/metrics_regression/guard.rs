//! SSRF guard metrics regression tests

use super::helpers::*;
use outbound_resilience_guard::{GuardConfig, GuardReason, GuardedClient};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn guard_rejection_metrics() {
    init_recorder();

    let http = GuardedClient::new(&GuardConfig::default()).unwrap();

    let err = http.get("http://169.254.169.254/latest/meta-data").await.unwrap_err();
    assert_eq!(err.guard_error().map(|e| e.reason), Some(GuardReason::PrivateDestination));
    let err = http.get("ftp://example.com/file").await.unwrap_err();
    assert_eq!(err.guard_error().map(|e| e.reason), Some(GuardReason::MalformedUrl));

    assert_counter_exists("guard_rejections_total");
    assert_metric_has_label("guard_rejections_total", "reason", "private_destination");
    assert_metric_has_label("guard_rejections_total", "reason", "malformed_url");
}
