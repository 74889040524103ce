//! ACL engine: evaluates rules against destinations and caches decisions.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{DecisionCache, DEFAULT_CACHE_CAPACITY};
use crate::error::{ResolveError, RulesError};
use crate::geoip::GeoIpReader;
use crate::parser;
use crate::resolve::{parse_ip_zone, HostAddr, Resolve};
use crate::rule::{Action, Rule};

/// Outcome of [`AclEngine::resolve_and_match`].
#[derive(Debug)]
pub struct Decision {
    /// Action to take; `action.arg()` carries the hijack target.
    pub action: Action,
    /// Whether the destination was a host name rather than an IP literal.
    pub is_domain: bool,
    /// Parsed IP literal, or the resolved address of a host name.
    pub addr: Option<HostAddr>,
    /// Resolver failure for host names. The decision is still usable.
    pub error: Option<ResolveError>,
}

impl Decision {
    pub fn arg(&self) -> &str {
        self.action.arg()
    }
}

/// The ACL engine: an ordered rule list, a default action, and a bounded
/// decision cache.
///
/// Send + Sync, designed to be shared via `Arc<AclEngine>`.
pub struct AclEngine {
    rules: Vec<Rule>,
    default_action: Action,
    cache: DecisionCache,
    resolver: Arc<dyn Resolve>,
    geoip: Option<Arc<dyn GeoIpReader>>,
}

impl AclEngine {
    /// Load rules from an ACL file and build an engine with the `proxy`
    /// default action.
    ///
    /// `geoip` is called at most once, and only when a rule needs it.
    pub fn load_from_file<F>(
        path: impl AsRef<Path>,
        resolver: Arc<dyn Resolve>,
        geoip: F,
    ) -> Result<Self, RulesError>
    where
        F: FnOnce() -> Result<Arc<dyn GeoIpReader>, RulesError>,
    {
        let mut builder = AclEngineBuilder::new();
        builder.load_file(path)?;
        builder.build(resolver, geoip)
    }

    /// Decide what to do with a connection to `destination`.
    ///
    /// IP literals (optionally with a `%zone`) are matched against IP and
    /// country rules and never hit the resolver. Host names are always
    /// resolved, even when the decision is cached, so the returned address
    /// and resolver error are fresh on every call.
    pub async fn resolve_and_match(&self, destination: &str) -> Decision {
        match parse_ip_zone(destination) {
            Some(addr) => self.match_ip(addr),
            None => self.match_domain(destination).await,
        }
    }

    fn match_ip(&self, addr: HostAddr) -> Decision {
        let key = addr.ip.to_string();
        let action = match self.cache.get(&key) {
            Some(action) => {
                debug!(ip = %key, action = %action, "acl cache hit");
                action
            }
            None => {
                let action = self
                    .rules
                    .iter()
                    .find(|rule| rule.matches_ip(addr.ip, self.geoip.as_deref()))
                    .map_or_else(|| self.default_action.clone(), |rule| {
                        debug!(ip = %key, rule = %rule, "acl rule matched");
                        rule.action().clone()
                    });
                self.cache.insert(key, action.clone());
                action
            }
        };

        Decision {
            action,
            is_domain: false,
            addr: Some(addr),
            error: None,
        }
    }

    async fn match_domain(&self, domain: &str) -> Decision {
        let (resolved, error) = match self.resolver.resolve(domain).await {
            Ok(ip) => (Some(ip.to_canonical()), None),
            Err(e) => {
                debug!(domain = %domain, error = %e, "acl resolve failed");
                (None, Some(e))
            }
        };

        let action = match self.cache.get(domain) {
            Some(action) => {
                debug!(domain = %domain, action = %action, "acl cache hit");
                action
            }
            None => {
                let action = self
                    .rules
                    .iter()
                    .find(|rule| {
                        rule.matches_domain(domain)
                            || resolved
                                .is_some_and(|ip| rule.matches_ip(ip, self.geoip.as_deref()))
                    })
                    .map_or_else(|| self.default_action.clone(), |rule| {
                        debug!(domain = %domain, rule = %rule, "acl rule matched");
                        rule.action().clone()
                    });
                self.cache.insert(domain.to_string(), action.clone());
                action
            }
        };

        Decision {
            action,
            is_domain: true,
            addr: resolved.map(HostAddr::new),
            error,
        }
    }

    /// Number of rules, in evaluation order.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Action returned when no rule matches.
    pub fn default_action(&self) -> &Action {
        &self.default_action
    }

    /// Whether a GeoIP database was loaded for country rules.
    pub fn has_geoip(&self) -> bool {
        self.geoip.is_some()
    }

    /// Number of cached decisions.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for AclEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclEngine")
            .field("rules", &self.rules.len())
            .field("default_action", &self.default_action)
            .field("cache_capacity", &self.cache.capacity())
            .field("geoip", &self.geoip.is_some())
            .finish()
    }
}

// ── Builder ──

/// Builder for constructing an `AclEngine`.
pub struct AclEngineBuilder {
    rules: Vec<Rule>,
    default_action: Action,
    cache_capacity: u64,
}

impl AclEngineBuilder {
    /// Create a new builder with the `proxy` default action.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_action: Action::Proxy,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Append a rule; rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> &mut Self {
        self.rules.extend(rules);
        self
    }

    /// Parse an ACL file and append its rules.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, RulesError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let rules = parser::parse_acl(&content)?;
        info!(path = %path.display(), rules = rules.len(), "ACL rules loaded");
        Ok(self.add_rules(rules))
    }

    /// Number of rules added so far.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Set the action used when no rule matches.
    pub fn set_default(&mut self, action: Action) -> &mut Self {
        self.default_action = action;
        self
    }

    /// Set the maximum number of cached decisions.
    pub fn cache_capacity(&mut self, capacity: u64) -> &mut Self {
        self.cache_capacity = capacity;
        self
    }

    /// Whether any rule needs a GeoIP database.
    pub fn needs_geoip(&self) -> bool {
        self.rules.iter().any(|r| r.country().is_some())
    }

    /// Build the engine.
    ///
    /// The GeoIP factory runs exactly once if some rule matches on country,
    /// and never otherwise. Its failure aborts the build.
    pub fn build<F>(self, resolver: Arc<dyn Resolve>, geoip: F) -> Result<AclEngine, RulesError>
    where
        F: FnOnce() -> Result<Arc<dyn GeoIpReader>, RulesError>,
    {
        let geoip = if self.needs_geoip() {
            Some(geoip()?)
        } else {
            None
        };

        debug!(
            rules = self.rules.len(),
            default = %self.default_action,
            cache_capacity = self.cache_capacity,
            geoip = geoip.is_some(),
            "built ACL engine"
        );

        Ok(AclEngine {
            rules: self.rules,
            default_action: self.default_action,
            cache: DecisionCache::new(self.cache_capacity),
            resolver,
            geoip,
        })
    }
}

impl Default for AclEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
