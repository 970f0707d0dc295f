//! Serde helpers for durations written as integer milliseconds.
//!
//! ```rust
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     #[serde(with = "outbound_resilience_core::duration_ms")]
//!     cooldown: Duration,
//! }
//!
//! let s: Settings = serde_json::from_str(r#"{ "cooldown": 1500 }"#).unwrap();
//! assert_eq!(s.cooldown, Duration::from_millis(1500));
//! ```

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serializes a duration as whole milliseconds.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

/// Deserializes whole milliseconds into a duration.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Same encoding for `Option<Duration>`; `null` or a missing field is `None`.
pub mod option {
    use super::*;

    /// Serializes `Some(d)` as milliseconds and `None` as null.
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes optional milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}
