//! Host resolution capability and address types.

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::ResolveError;

/// DNS resolution capability injected into the engine.
///
/// Timeouts and retries are the implementation's business; the engine
/// awaits the call as-is.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve a host name to a single address.
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError>;
}

/// An IP address with an optional IPv6 zone (scope) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddr {
    pub ip: IpAddr,
    pub zone: Option<String>,
}

impl HostAddr {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip, zone: None }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.zone {
            Some(zone) => write!(f, "{}%{zone}", self.ip),
            None => write!(f, "{}", self.ip),
        }
    }
}

/// Parse an IP literal with an optional `%zone` suffix.
///
/// Returns `None` when the host part is not an IP address. IPv4-mapped IPv6
/// addresses are folded to IPv4 so they share cache entries and CIDR rules
/// with their IPv4 form.
pub fn parse_ip_zone(s: &str) -> Option<HostAddr> {
    let (host, zone) = match s.rfind('%') {
        Some(i) if i > 0 => (&s[..i], Some(&s[i + 1..])),
        _ => (s, None),
    };
    let ip = host.parse::<IpAddr>().ok()?.to_canonical();
    Some(HostAddr {
        ip,
        zone: zone.filter(|z| !z.is_empty()).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn parse_plain_ipv4() {
        let addr = parse_ip_zone("8.8.8.8").unwrap();
        assert_eq!(addr.ip, IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
        assert_eq!(addr.zone, None);
    }

    #[test]
    fn parse_ipv6_with_zone() {
        let addr = parse_ip_zone("fe80::1%eth0").unwrap();
        assert_eq!(addr.ip, "fe80::1".parse::<IpAddr>().unwrap());
        assert_eq!(addr.zone.as_deref(), Some("eth0"));
        assert_eq!(addr.to_string(), "fe80::1%eth0");
    }

    #[test]
    fn parse_mapped_ipv4_is_canonical() {
        let addr = parse_ip_zone("::ffff:10.0.0.1").unwrap();
        assert_eq!(addr.ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn parse_rejects_domains() {
        assert!(parse_ip_zone("example.com").is_none());
        assert!(parse_ip_zone("").is_none());
        assert!(parse_ip_zone("%eth0").is_none());
        assert!(parse_ip_zone("[::1]").is_none());
    }

    #[test]
    fn loopback_v6_display() {
        assert_eq!(HostAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST)).to_string(), "::1");
    }
}
