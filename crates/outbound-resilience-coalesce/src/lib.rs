//! Single-flight deduplication of concurrent identical requests.
//!
//! When several callers ask for the same key at the same time, only the
//! first one (the leader) runs the fetch; the others (followers) wait for it
//! and receive a clone of its result. Nothing is retained after the execution
//! finishes, so this is not a cache: the next call for the key executes
//! again.
//!
//! ```text
//! caller A ─┐
//! caller B ─┼─ key "org:123" ──► one fetch ──► result cloned to A, B, C
//! caller C ─┘
//! ```
//!
//! The fetch runs in its own task. A caller that is cancelled, or whose
//! deadline passes, gets [`CoalesceError::Canceled`] right away while the
//! execution continues for everyone else. If the fetch panics, every waiter
//! gets [`CoalesceError::Aborted`] and the key is cleared.
//!
//! ```rust
//! use outbound_resilience_coalesce::RequestDeduplicator;
//! use outbound_resilience_core::RequestContext;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dedup: RequestDeduplicator<String, u32, String> = RequestDeduplicator::new("lookups");
//! let ctx = RequestContext::new();
//!
//! let shared = dedup
//!     .run(&ctx, "org:123".to_string(), || async { Ok(42) })
//!     .await
//!     .unwrap();
//! assert_eq!(shared.value, 42);
//! assert!(shared.was_leader);
//! # }
//! ```

mod dedup;
mod error;

pub use dedup::{RequestDeduplicator, Shared};
pub use error::CoalesceError;
