//! Core infrastructure for outbound-resilience.
//!
//! This crate holds what every pattern crate in the workspace shares:
//! - [`events`]: observer hooks each component emits through
//! - [`error`]: the unified [`ResilienceError`] taxonomy, guard reasons and
//!   configuration errors
//! - [`context`]: [`RequestContext`], the cancellation and deadline signal
//!   every blocking call accepts
//! - `duration_ms` (feature `serde`): millisecond durations in config files

pub mod context;
#[cfg(feature = "serde")]
pub mod duration_ms;
pub mod error;
pub mod events;

pub use context::{CancelCause, RequestContext};
pub use error::{ConfigError, GuardReason, ResilienceError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
