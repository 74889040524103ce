//! Async host resolver backed by hickory-resolver.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use acl_rules::{Resolve, ResolveError};
use async_trait::async_trait;
use hickory_proto::xfer::Protocol;
use hickory_resolver::Resolver;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::debug;

use crate::config::{DnsConfig, DnsStrategy};
use crate::error::DnsError;

/// Shared async DNS resolver used by the ACL engine.
///
/// Wraps `hickory_resolver::Resolver` with its built-in TTL cache,
/// configurable nameservers (UDP/TCP/DoT/DoH) and `prefer_ipv4`.
/// Cheap to clone.
#[derive(Clone)]
pub struct DnsResolver {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Resolver<TokioConnectionProvider>,
    prefer_ipv4: bool,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver")
            .field("prefer_ipv4", &self.inner.prefer_ipv4)
            .finish()
    }
}

impl DnsResolver {
    /// Build a resolver from configuration.
    pub fn new(config: &DnsConfig) -> Result<Self, DnsError> {
        let resolver = match config.strategy {
            DnsStrategy::System => {
                let mut builder = Resolver::builder_tokio()
                    .map_err(|e| DnsError::InvalidServer(format!("system config: {e}")))?;
                builder.options_mut().cache_size = config.cache_size;
                builder.build()
            }
            DnsStrategy::Custom => {
                let name_servers = parse_server_urls(&config.servers)?;
                let mut opts = ResolverOpts::default();
                opts.cache_size = config.cache_size;
                let mut builder = Resolver::builder_with_config(
                    ResolverConfig::from_parts(None, vec![], name_servers),
                    TokioConnectionProvider::default(),
                );
                *builder.options_mut() = opts;
                builder.build()
            }
        };

        Ok(Self {
            inner: Arc::new(Inner {
                resolver,
                prefer_ipv4: config.prefer_ipv4,
            }),
        })
    }

    /// Resolve a host name to one address.
    ///
    /// IP literals are returned as-is. Otherwise the first answer wins, or
    /// the first IPv4 answer when `prefer_ipv4` is set.
    pub async fn lookup(&self, host: &str) -> Result<IpAddr, DnsError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let response = self.inner.resolver.lookup_ip(host).await?;
        let ip = if self.inner.prefer_ipv4 {
            response
                .iter()
                .find(IpAddr::is_ipv4)
                .or_else(|| response.iter().next())
        } else {
            response.iter().next()
        };

        match ip {
            Some(ip) => {
                debug!(host = %host, resolved = %ip, "dns resolved");
                Ok(ip)
            }
            None => Err(DnsError::NoResults(host.to_string())),
        }
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
        self.lookup(host)
            .await
            .map_err(|e| ResolveError::new(host, e))
    }
}

/// A nameserver URL broken into its parts.
#[derive(Debug, PartialEq, Eq)]
struct ServerUrl<'a> {
    protocol: Protocol,
    host: &'a str,
    port: u16,
    /// DoH request path.
    path: Option<String>,
}

impl<'a> ServerUrl<'a> {
    fn parse(url: &'a str) -> Result<Self, DnsError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| DnsError::InvalidServer(format!("missing scheme: {url}")))?;

        let (protocol, default_port) = match scheme {
            "udp" => (Protocol::Udp, 53),
            "tcp" => (Protocol::Tcp, 53),
            "tls" => (Protocol::Tls, 853),
            "https" => (Protocol::Https, 443),
            _ => {
                return Err(DnsError::InvalidServer(format!(
                    "unsupported protocol: {scheme}"
                )));
            }
        };

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) if protocol == Protocol::Https => {
                (authority, Some(format!("/{path}")))
            }
            Some(_) => {
                return Err(DnsError::InvalidServer(format!(
                    "unexpected path for {scheme} server: {url}"
                )));
            }
            None if protocol == Protocol::Https => (rest, Some("/dns-query".to_string())),
            None => (rest, None),
        };

        let (host, port) = split_host_port(authority, default_port)?;
        Ok(Self {
            protocol,
            host,
            port,
            path,
        })
    }

    fn into_config(self) -> Result<NameServerConfig, DnsError> {
        let socket_addr = server_socket_addr(self.host, self.port)?;
        let tls_dns_name = matches!(self.protocol, Protocol::Tls | Protocol::Https)
            .then(|| self.host.to_string());
        Ok(NameServerConfig {
            socket_addr,
            protocol: self.protocol,
            tls_dns_name,
            http_endpoint: self.path,
            trust_negative_responses: false,
            bind_addr: None,
        })
    }
}

/// Parse server URL strings into a hickory `NameServerConfigGroup`.
fn parse_server_urls(urls: &[String]) -> Result<NameServerConfigGroup, DnsError> {
    if urls.is_empty() {
        return Err(DnsError::InvalidServer(
            "no dns servers configured".to_string(),
        ));
    }

    let configs = urls
        .iter()
        .map(|url| ServerUrl::parse(url)?.into_config())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NameServerConfigGroup::from(configs))
}

/// Split `host[:port]` or `[v6][:port]`, applying `default_port`.
///
/// Raw IPv6 literals must be bracketed.
fn split_host_port(s: &str, default_port: u16) -> Result<(&str, u16), DnsError> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| DnsError::InvalidServer(format!("invalid port in: {s}")))
    };

    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| DnsError::InvalidServer(format!("invalid IPv6 host in: {s}")))?;
        let port = match tail {
            "" => default_port,
            _ => parse_port(tail.strip_prefix(':').ok_or_else(|| {
                DnsError::InvalidServer(format!("invalid port separator in: {s}"))
            })?)?,
        };
        (host, port)
    } else if let Some((host, port)) = s.rsplit_once(':') {
        if host.contains(':') {
            return Err(DnsError::InvalidServer(format!(
                "ipv6 host must be bracketed in server url: {s}"
            )));
        }
        (host, parse_port(port)?)
    } else {
        (s, default_port)
    };

    if host.is_empty() {
        return Err(DnsError::InvalidServer(format!("empty host in: {s}")));
    }
    Ok((host, port))
}

/// Nameserver hosts given by name are resolved once, with the system resolver.
fn server_socket_addr(host: &str, port: u16) -> Result<SocketAddr, DnsError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            DnsError::InvalidServer(format!("failed to resolve dns server host '{host}': {e}"))
        })?
        .next()
        .ok_or_else(|| DnsError::InvalidServer(format!("dns server host has no addresses: {host}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_defaults() {
        let udp = ServerUrl::parse("udp://8.8.8.8").unwrap();
        assert_eq!((udp.protocol, udp.host, udp.port), (Protocol::Udp, "8.8.8.8", 53));

        let tls = ServerUrl::parse("tls://dns.example").unwrap();
        assert_eq!((tls.protocol, tls.port), (Protocol::Tls, 853));

        let doh = ServerUrl::parse("https://1.1.1.1").unwrap();
        assert_eq!(doh.port, 443);
        assert_eq!(doh.path.as_deref(), Some("/dns-query"));
    }

    #[test]
    fn server_url_explicit_port_and_path() {
        let tcp = ServerUrl::parse("tcp://1.1.1.1:5353").unwrap();
        assert_eq!(tcp.port, 5353);

        let doh = ServerUrl::parse("https://8.8.8.8:8443/resolve").unwrap();
        assert_eq!(doh.port, 8443);
        assert_eq!(doh.path.as_deref(), Some("/resolve"));
    }

    #[test]
    fn server_url_bracketed_ipv6() {
        let url = ServerUrl::parse("udp://[2001:4860:4860::8888]:53").unwrap();
        assert_eq!(url.host, "2001:4860:4860::8888");
        ServerUrl::parse("udp://2001:4860:4860::8888").unwrap_err();
    }

    #[test]
    fn server_url_rejects_bad_input() {
        ServerUrl::parse("8.8.8.8").unwrap_err();
        ServerUrl::parse("ftp://8.8.8.8").unwrap_err();
        ServerUrl::parse("udp://8.8.8.8/path").unwrap_err();
        ServerUrl::parse("udp://:53").unwrap_err();
        ServerUrl::parse("udp://8.8.8.8:notaport").unwrap_err();
    }

    #[test]
    fn parse_server_urls_mixed() {
        let urls = vec![
            "udp://8.8.8.8".to_string(),
            "tls://1.1.1.1".to_string(),
            "https://8.8.4.4/dns-query".to_string(),
        ];
        let group = parse_server_urls(&urls).unwrap();
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn parse_server_urls_empty() {
        parse_server_urls(&[]).unwrap_err();
    }

    #[tokio::test]
    async fn lookup_ip_literal_skips_dns() {
        let config = DnsConfig {
            strategy: DnsStrategy::Custom,
            servers: vec!["udp://127.0.0.1:1".to_string()],
            ..Default::default()
        };
        let resolver = DnsResolver::new(&config).unwrap();
        let ip = resolver.lookup("10.0.0.1").await.unwrap();
        assert_eq!(ip, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn resolve_trait_passes_ip_literals() {
        let config = DnsConfig {
            strategy: DnsStrategy::Custom,
            servers: vec!["udp://127.0.0.1:1".to_string()],
            ..Default::default()
        };
        let resolver = DnsResolver::new(&config).unwrap();
        let ip = Resolve::resolve(&resolver, "::1").await.unwrap();
        assert_eq!(ip, "::1".parse::<IpAddr>().unwrap());
    }
}
