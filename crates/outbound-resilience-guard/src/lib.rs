//! Connect-time SSRF guard for outbound HTTP.
//!
//! Checking a URL's hostname before sending a request is not enough: the name
//! can resolve to a public address during the check and to an internal one
//! when the connection is made, and a public upstream can redirect to an
//! internal one. This crate checks the addresses that are actually dialed.
//!
//! - [`AddressPolicy`]: the immutable blocklist (loopback, private,
//!   link-local, cloud metadata, reserved, multicast) plus exemptions
//! - [`GuardedResolver`]: a [`reqwest::dns::Resolve`] hook that fails closed
//!   and rejects any blocked answer
//! - [`redirect_policy`] and [`check_url`]: per-hop checks, and checks for
//!   IP-literal hosts the resolver never sees
//! - [`GuardedClient`]: a `reqwest::Client` wired with all of the above
//!
//! ```rust,no_run
//! use outbound_resilience_guard::{GuardConfig, GuardedClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = GuardedClient::new(&GuardConfig::default())?;
//!
//! match http.get_text("http://169.254.169.254/latest/meta-data").await {
//!     Err(err) if err.is_guard_rejected() => println!("blocked: {}", err),
//!     other => println!("{:?}", other.map(|body| body.len())),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tracing`: log rejections at warn level
//! - `metrics`: count rejections in `guard_rejections_total{reason}`
//! - `serde`: deserialize [`GuardConfig`] and [`IpRange`]

mod client;
mod config;
mod error;
mod policy;
mod range;
mod redirect;
mod resolver;

pub use client::GuardedClient;
pub use config::GuardConfig;
pub use error::{GuardError, HttpError};
pub use outbound_resilience_core::GuardReason;
pub use policy::{AddressPolicy, BlockedRange, DEFAULT_BLOCKED};
pub use range::{canonical, embedded_ipv4, IpRange};
pub use redirect::{check_url, parse_checked, redirect_policy};
pub use resolver::{GuardedResolver, Lookup, StaticLookup, SystemLookup};
