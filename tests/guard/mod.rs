mod policy;
mod redirect;

use outbound_resilience_guard::{GuardConfig, GuardedClient, StaticLookup};
use std::sync::Arc;

/// Shows guard rejections in the output of failing tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A client that can reach loopback, with `lookup` for name resolution.
pub fn loopback_client(lookup: StaticLookup) -> GuardedClient {
    init_tracing();
    GuardedClient::with_lookup(&GuardConfig::default().allow_loopback(), Arc::new(lookup)).unwrap()
}

/// A client with the production policy.
pub fn default_client(lookup: StaticLookup) -> GuardedClient {
    init_tracing();
    GuardedClient::with_lookup(&GuardConfig::default(), Arc::new(lookup)).unwrap()
}
