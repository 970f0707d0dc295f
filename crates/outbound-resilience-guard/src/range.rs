//! CIDR ranges over `std::net` addresses.

use outbound_resilience_core::ConfigError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A contiguous block of IPv4 or IPv6 addresses, written `addr/prefix`.
///
/// The network address is stored with host bits cleared, so
/// `"10.1.2.3/8"` and `"10.0.0.0/8"` are the same range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRange {
    network: IpAddr,
    prefix: u8,
}

impl IpRange {
    /// Creates a range, rejecting prefixes longer than the address.
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, ConfigError> {
        let network = match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(ConfigError::InvalidRange(format!("{}/{}", addr, prefix)));
                }
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix)))
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(ConfigError::InvalidRange(format!("{}/{}", addr, prefix)));
                }
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix)))
            }
        };
        Ok(Self { network, prefix })
    }

    /// IPv4 range from octets. Panics on a prefix above 32; only for
    /// constant tables.
    pub(crate) const fn v4(octets: [u8; 4], prefix: u8) -> Self {
        assert!(prefix <= 32);
        Self {
            network: IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3])),
            prefix,
        }
    }

    /// IPv6 range from segments. Panics on a prefix above 128; only for
    /// constant tables.
    pub(crate) const fn v6(segments: [u16; 8], prefix: u8) -> Self {
        assert!(prefix <= 128);
        let [a, b, c, d, e, f, g, h] = segments;
        Self {
            network: IpAddr::V6(Ipv6Addr::new(a, b, c, d, e, f, g, h)),
            prefix,
        }
    }

    /// A range holding exactly `addr`.
    pub fn host(addr: IpAddr) -> Self {
        let prefix = if addr.is_ipv4() { 32 } else { 128 };
        Self {
            network: addr,
            prefix,
        }
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns true if `ip` lies in this range.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are compared in their
    /// IPv4 form. Other cross-family comparisons never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, canonical(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(ip) & v4_mask(self.prefix) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(ip) & v6_mask(self.prefix) == u128::from(net)
            }
            _ => false,
        }
    }
}

/// Unwraps IPv4-mapped IPv6 addresses so they are classified as IPv4.
pub fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        v4 => v4,
    }
}

/// The IPv4 address carried inside a translation or tunnelling form:
/// NAT64 (`64:ff9b::/96`), 6to4 (`2002::/16`) and IPv4-compatible
/// (`::/96`). IPv4-mapped addresses are handled by [`canonical`].
pub fn embedded_ipv4(ip: IpAddr) -> Option<Ipv4Addr> {
    let IpAddr::V6(v6) = ip else {
        return None;
    };
    let bits = u128::from(v6);
    let low = Ipv4Addr::from(bits as u32);
    match v6.segments() {
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(low),
        [0x2002, hi, lo, ..] => Some(Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo))),
        [0, 0, 0, 0, 0, 0, _, _] => Some(low),
        _ => None,
    }
}

fn v4_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

fn v6_mask(prefix: u8) -> u128 {
    match prefix {
        0 => 0,
        p => u128::MAX << (128 - u32::from(p)),
    }
}

impl FromStr for IpRange {
    type Err = ConfigError;

    /// Parses `addr/prefix`, or a bare address as a single-host range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ConfigError::InvalidRange(s.to_string());
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
                IpRange::new(addr, prefix).map_err(|_| invalid())
            }
            None => s.parse::<IpAddr>().map(IpRange::host).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for IpRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
