//! Resilient outbound HTTP calls.
//!
//! One [`ResilientClient`] per upstream composes the workspace's components
//! into a single pipeline:
//!
//! ```text
//! caller ─► ConcurrencyLimiter ─► CircuitBreaker ─► RequestDeduplicator ─► Cache
//!                                                                          │ miss
//!                                         GuardedClient (connect-time SSRF guard) ◄─┘
//! ```
//!
//! 1. [`ConcurrencyLimiter`] bounds concurrent calls; waiting respects the
//!    caller's [`RequestContext`].
//! 2. [`CircuitBreaker`] rejects calls to an upstream that keeps failing.
//! 3. [`RequestDeduplicator`] collapses concurrent calls with the same key
//!    into one execution.
//! 4. [`Cache`] answers repeated keys without reaching the upstream.
//! 5. The fetch function runs under the request timeout, usually through the
//!    [`GuardedClient`], which refuses private, loopback, link-local and
//!    metadata destinations at connect time and on every redirect.
//!
//! Upstream errors, timeouts and panics count against the breaker. Guard
//! rejections and cancellations are returned to the caller without counting.
//! Nothing is retried.
//!
//! ```rust,no_run
//! use outbound_resilience::{ResilienceConfig, ResilientClient};
//! use outbound_resilience::core::RequestContext;
//! use outbound_resilience::guard::HttpError;
//! use std::time::Duration;
//!
//! # #[derive(Clone, serde::Deserialize)] struct Company { name: String }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResilienceConfig::from_toml_str(r#"
//!     [circuit_breaker]
//!     name = "company-registry"
//!     failure_threshold = 5
//!     cooldown = 30000
//! "#)?;
//! let client: ResilientClient<Company, HttpError> = ResilientClient::new(config)?;
//!
//! let ctx = RequestContext::with_timeout(Duration::from_secs(2));
//! let company = client
//!     .get_json(&ctx, "https://registry.example.com/companies/123456789")
//!     .await?;
//! println!("{}", company.name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tracing` (default): structured logs from every component
//! - `metrics`: counters and gauges from every component via the `metrics`
//!   crate
//!
//! [`ConcurrencyLimiter`]: outbound_resilience_bulkhead::ConcurrencyLimiter
//! [`CircuitBreaker`]: outbound_resilience_circuitbreaker::CircuitBreaker
//! [`RequestDeduplicator`]: outbound_resilience_coalesce::RequestDeduplicator
//! [`Cache`]: outbound_resilience_cache::Cache
//! [`GuardedClient`]: outbound_resilience_guard::GuardedClient
//! [`RequestContext`]: outbound_resilience_core::RequestContext

mod client;
mod config;
mod layer;

pub use client::ResilientClient;
pub use config::ResilienceConfig;
pub use layer::{ResilienceLayer, ResilienceService};

pub use outbound_resilience_core::{CancelCause, RequestContext, ResilienceError};

pub use outbound_resilience_bulkhead as bulkhead;
pub use outbound_resilience_cache as cache;
pub use outbound_resilience_circuitbreaker as circuitbreaker;
pub use outbound_resilience_coalesce as coalesce;
pub use outbound_resilience_core as core;
pub use outbound_resilience_guard as guard;
