use crate::policy::AddressPolicy;
use crate::range::IpRange;
use outbound_resilience_core::ConfigError;
use std::time::Duration;

/// Configuration for a [`GuardedClient`](crate::GuardedClient).
///
/// ```toml
/// max_redirects = 3
/// request_timeout = 5000
/// block = ["93.184.216.0/24"]
/// exempt = ["127.0.0.0/8"]   # local mock servers only
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuardConfig {
    /// Ranges blocked in addition to the built-in list.
    pub block: Vec<IpRange>,

    /// Ranges exempted from blocking. Empty in production.
    pub exempt: Vec<IpRange>,

    /// Redirect hops followed before the request fails.
    ///
    /// Default: 5
    pub max_redirects: usize,

    /// Bound on a whole request, redirects and body included.
    ///
    /// Default: 10 seconds
    #[cfg_attr(feature = "serde", serde(with = "outbound_resilience_core::duration_ms"))]
    pub request_timeout: Duration,

    /// Bound on establishing a connection.
    ///
    /// Default: `None` (covered by `request_timeout`)
    #[cfg_attr(
        feature = "serde",
        serde(with = "outbound_resilience_core::duration_ms::option")
    )]
    pub connect_timeout: Option<Duration>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            block: Vec::new(),
            exempt: Vec::new(),
            max_redirects: 5,
            request_timeout: Duration::from_secs(10),
            connect_timeout: None,
            user_agent: format!("outbound-resilience/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "guard",
                "request_timeout",
                "must be greater than zero",
            ));
        }
        if self.connect_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::invalid(
                "guard",
                "connect_timeout",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// The address policy described by `block` and `exempt`.
    pub fn policy(&self) -> AddressPolicy {
        AddressPolicy::default()
            .with_blocked(self.block.iter().copied())
            .with_exemptions(self.exempt.iter().copied())
    }

    /// Exempts loopback so a local mock server is reachable. Never use in
    /// production.
    pub fn allow_loopback(mut self) -> Self {
        self.exempt.push(IpRange::v4([127, 0, 0, 0], 8));
        self.exempt.push(IpRange::v6([0, 0, 0, 0, 0, 0, 0, 1], 128));
        self
    }
}
