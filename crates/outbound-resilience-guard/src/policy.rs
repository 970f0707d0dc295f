//! Which destination addresses may be dialed.

use crate::error::GuardError;
use crate::range::{canonical, embedded_ipv4, IpRange};
use outbound_resilience_core::GuardReason;
use std::fmt;
use std::net::IpAddr;

/// A blocked range with a short label for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedRange {
    pub range: IpRange,
    pub label: &'static str,
}

impl fmt::Display for BlockedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.range, self.label)
    }
}

const fn blocked(range: IpRange, label: &'static str) -> BlockedRange {
    BlockedRange { range, label }
}

/// Ranges no upstream call may reach.
pub const DEFAULT_BLOCKED: &[BlockedRange] = &[
    blocked(IpRange::v4([0, 0, 0, 0], 8), "this network"),
    blocked(IpRange::v4([10, 0, 0, 0], 8), "private"),
    blocked(IpRange::v4([100, 64, 0, 0], 10), "shared address space"),
    blocked(IpRange::v4([127, 0, 0, 0], 8), "loopback"),
    blocked(IpRange::v4([169, 254, 0, 0], 16), "link-local"),
    blocked(IpRange::v4([172, 16, 0, 0], 12), "private"),
    blocked(IpRange::v4([192, 0, 0, 0], 24), "ietf protocol assignments"),
    blocked(IpRange::v4([192, 0, 2, 0], 24), "documentation"),
    blocked(IpRange::v4([192, 168, 0, 0], 16), "private"),
    blocked(IpRange::v4([198, 18, 0, 0], 15), "benchmarking"),
    blocked(IpRange::v4([198, 51, 100, 0], 24), "documentation"),
    blocked(IpRange::v4([203, 0, 113, 0], 24), "documentation"),
    blocked(IpRange::v4([224, 0, 0, 0], 4), "multicast"),
    blocked(IpRange::v4([240, 0, 0, 0], 4), "reserved"),
    blocked(IpRange::v6([0, 0, 0, 0, 0, 0, 0, 0], 128), "unspecified"),
    blocked(IpRange::v6([0, 0, 0, 0, 0, 0, 0, 1], 128), "loopback"),
    blocked(IpRange::v6([0x100, 0, 0, 0, 0, 0, 0, 0], 64), "discard-only"),
    blocked(IpRange::v6([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0], 32), "documentation"),
    blocked(IpRange::v6([0xfc00, 0, 0, 0, 0, 0, 0, 0], 7), "unique local"),
    blocked(IpRange::v6([0xfe80, 0, 0, 0, 0, 0, 0, 0], 10), "link-local"),
    blocked(IpRange::v6([0xfec0, 0, 0, 0, 0, 0, 0, 0], 10), "site-local"),
    blocked(IpRange::v6([0xff00, 0, 0, 0, 0, 0, 0, 0], 8), "multicast"),
];

/// An immutable blocklist of address ranges plus exemptions.
///
/// The default policy blocks loopback, private, link-local (including the
/// cloud metadata address 169.254.169.254), shared, documentation,
/// multicast and reserved ranges for both IPv4 and IPv6. Exemptions take
/// precedence over blocked ranges; the default has none and they should
/// only be used outside production (for example to reach a local mock
/// server).
///
/// ```rust
/// use outbound_resilience_guard::AddressPolicy;
///
/// let policy = AddressPolicy::default();
/// assert!(!policy.is_allowed("169.254.169.254".parse().unwrap()));
/// assert!(policy.is_allowed("93.184.216.34".parse().unwrap()));
///
/// let testing = AddressPolicy::default().with_exemptions(["127.0.0.0/8".parse().unwrap()]);
/// assert!(testing.is_allowed("127.0.0.1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPolicy {
    blocked: Vec<BlockedRange>,
    exempt: Vec<IpRange>,
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self {
            blocked: DEFAULT_BLOCKED.to_vec(),
            exempt: Vec::new(),
        }
    }
}

impl AddressPolicy {
    /// A policy that blocks nothing.
    pub fn allow_all() -> Self {
        Self {
            blocked: Vec::new(),
            exempt: Vec::new(),
        }
    }

    /// Adds ranges to the blocklist.
    pub fn with_blocked(mut self, ranges: impl IntoIterator<Item = IpRange>) -> Self {
        self.blocked
            .extend(ranges.into_iter().map(|range| blocked(range, "configured")));
        self
    }

    /// Exempts ranges from the blocklist.
    pub fn with_exemptions(mut self, ranges: impl IntoIterator<Item = IpRange>) -> Self {
        self.exempt.extend(ranges);
        self
    }

    /// Returns the blocked range `ip` falls in, or `None` if it may be dialed.
    ///
    /// IPv6 forms that carry an IPv4 address (mapped, NAT64, 6to4,
    /// IPv4-compatible) are also judged by that IPv4 address.
    pub fn classify(&self, ip: IpAddr) -> Option<&BlockedRange> {
        let ip = canonical(ip);
        if self.exempt.iter().any(|range| range.contains(ip)) {
            return None;
        }
        if let Some(blocked) = self.blocked.iter().find(|blocked| blocked.range.contains(ip)) {
            return Some(blocked);
        }
        embedded_ipv4(ip).and_then(|v4| self.classify(IpAddr::V4(v4)))
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.classify(ip).is_none()
    }

    /// `Ok` if `ip` may be dialed, otherwise a
    /// [`PrivateDestination`](GuardReason::PrivateDestination) rejection.
    pub fn check(&self, ip: IpAddr) -> Result<(), GuardError> {
        match self.classify(ip) {
            None => Ok(()),
            Some(blocked) => Err(GuardError::new(
                GuardReason::PrivateDestination,
                format!("{} is in {}", ip, blocked),
            )),
        }
    }

    pub fn blocked(&self) -> &[BlockedRange] {
        &self.blocked
    }

    pub fn exemptions(&self) -> &[IpRange] {
        &self.exempt
    }
}
