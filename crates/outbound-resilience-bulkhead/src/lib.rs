//! Concurrency limiter for outbound calls.
//!
//! A counting semaphore with a fixed number of slots. [`ConcurrencyLimiter::acquire`]
//! waits for a slot and hands back a [`Permit`] that frees the slot when
//! dropped. Waiting is cancellation-aware: a done [`RequestContext`] ends the
//! wait at once, and an optional `max_wait` bounds it.
//!
//! ```rust
//! use outbound_resilience_bulkhead::{ConcurrencyLimiter, LimiterConfig};
//! use outbound_resilience_core::RequestContext;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = ConcurrencyLimiter::new(LimiterConfig {
//!     max_concurrent: 4,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let ctx = RequestContext::new();
//! let permit = limiter.acquire(&ctx).await.unwrap();
//! assert_eq!(limiter.available(), 3);
//! drop(permit);
//! assert_eq!(limiter.available(), 4);
//! # }
//! ```
//!
//! [`RequestContext`]: outbound_resilience_core::RequestContext

mod config;
mod error;
mod events;
mod limiter;

pub use config::LimiterConfig;
pub use error::LimiterError;
pub use events::LimiterEvent;
pub use limiter::{ConcurrencyLimiter, Permit};
