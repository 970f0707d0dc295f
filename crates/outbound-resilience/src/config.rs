//! Aggregated configuration for [`ResilientClient`](crate::ResilientClient).

use outbound_resilience_bulkhead::LimiterConfig;
use outbound_resilience_cache::CacheConfig;
use outbound_resilience_circuitbreaker::CircuitBreakerConfig;
use outbound_resilience_core::ConfigError;
use outbound_resilience_guard::GuardConfig;

/// One section per component. Missing sections and fields take their
/// defaults.
///
/// ```rust
/// use outbound_resilience::ResilienceConfig;
/// use std::time::Duration;
///
/// let config = ResilienceConfig::from_toml_str(r#"
///     [cache]
///     capacity = 500
///     default_ttl = 60000
///
///     [circuit_breaker]
///     name = "registry"
///     failure_threshold = 3
///     cooldown = 10000
///
///     [limiter]
///     max_concurrent = 8
///
///     [guard]
///     request_timeout = 5000
/// "#).unwrap();
///
/// assert_eq!(config.cache.capacity, 500);
/// assert_eq!(config.circuit_breaker.cooldown, Duration::from_secs(10));
/// assert_eq!(config.limiter.max_concurrent, 8);
/// assert_eq!(config.guard.max_redirects, 5);
/// ```
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub limiter: LimiterConfig,
    pub guard: GuardConfig,
}

impl ResilienceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: ResilienceConfig =
            toml::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.circuit_breaker.validate()?;
        self.limiter.validate()?;
        self.guard.validate()
    }
}
