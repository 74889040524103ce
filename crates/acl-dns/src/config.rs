//! Resolver configuration.

use serde::{Deserialize, Serialize};

use crate::error::DnsError;

/// How the ACL engine resolves host names.
///
/// Every field has a default, so an omitted `[dns]` table means the system
/// resolver with a 256-entry cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// `system` reads `/etc/resolv.conf` (or the platform equivalent);
    /// `custom` uses `servers`.
    pub strategy: DnsStrategy,

    /// Nameserver URLs for the `custom` strategy: `udp://8.8.8.8`,
    /// `tcp://8.8.8.8:53`, `tls://1.1.1.1`, `https://dns.google/dns-query`.
    /// Ports default to 53, 53, 853 and 443.
    pub servers: Vec<String>,

    /// Prefer an IPv4 answer when both A and AAAA records exist.
    pub prefer_ipv4: bool,

    /// Resolver cache capacity. 0 disables caching.
    pub cache_size: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            strategy: DnsStrategy::default(),
            servers: Vec::new(),
            prefer_ipv4: false,
            cache_size: 256,
        }
    }
}

impl DnsConfig {
    /// Reject configurations that cannot produce a working resolver.
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.strategy == DnsStrategy::Custom && self.servers.is_empty() {
            return Err(DnsError::InvalidServer(
                "custom strategy requires at least one server".to_string(),
            ));
        }
        Ok(())
    }
}

/// DNS resolution strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DnsStrategy {
    #[default]
    System,
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: DnsConfig = toml::from_str("").unwrap();
        assert_eq!(config.strategy, DnsStrategy::System);
        assert_eq!(config.cache_size, 256);
        assert!(!config.prefer_ipv4);
        config.validate().unwrap();
    }

    #[test]
    fn custom_servers() {
        let config: DnsConfig = toml::from_str(
            r#"
strategy = "custom"
servers = ["udp://1.1.1.1", "tls://dns.example"]
prefer_ipv4 = true
"#,
        )
        .unwrap();
        assert_eq!(config.strategy, DnsStrategy::Custom);
        assert_eq!(config.servers.len(), 2);
        assert!(config.prefer_ipv4);
        config.validate().unwrap();
    }

    #[test]
    fn custom_without_servers_invalid() {
        let config = DnsConfig {
            strategy: DnsStrategy::Custom,
            ..Default::default()
        };
        config.validate().unwrap_err();
    }
}
