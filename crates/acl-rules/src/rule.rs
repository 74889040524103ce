//! Rule and action type definitions.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::RulesError;
use crate::geoip::GeoIpReader;

/// Action to take when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Connect directly to the target.
    Direct,
    /// Send the connection through the proxy.
    Proxy,
    /// Refuse the connection.
    Block,
    /// Connect to a substitute address instead of the target.
    Hijack(String),
}

impl Action {
    /// The action argument: the substitute address for `Hijack`, empty otherwise.
    pub fn arg(&self) -> &str {
        match self {
            Action::Hijack(target) => target,
            _ => "",
        }
    }

    /// Keyword used for this action in rule files.
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Direct => "direct",
            Action::Proxy => "proxy",
            Action::Block => "block",
            Action::Hijack(_) => "hijack",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hijack(target) => write!(f, "hijack {target}"),
            other => f.write_str(other.keyword()),
        }
    }
}

/// What a rule matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Exact host name (stored lower-case).
    Domain(String),
    /// Host name or any of its subdomains (stored lower-case, no leading dot).
    DomainSuffix(String),
    /// IP network; single addresses are stored as /32 or /128.
    Cidr(IpNet),
    /// ISO 3166-1 alpha-2 country code (stored upper-case).
    Country(String),
    /// Matches everything.
    All,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Domain(d) => write!(f, "domain {d}"),
            Condition::DomainSuffix(s) => write!(f, "domain-suffix {s}"),
            Condition::Cidr(net) => write!(f, "cidr {net}"),
            Condition::Country(c) => write!(f, "country {c}"),
            Condition::All => f.write_str("all"),
        }
    }
}

/// A single ACL entry: a condition and the action taken when it matches.
///
/// Rules are immutable; matching is a pure function of the candidate and
/// the rule (plus the GeoIP database for country rules).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    action: Action,
    condition: Condition,
}

impl Rule {
    pub fn new(action: Action, condition: Condition) -> Self {
        Self { action, condition }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Country code this rule needs a GeoIP lookup for, if any.
    pub fn country(&self) -> Option<&str> {
        match &self.condition {
            Condition::Country(code) => Some(code),
            _ => None,
        }
    }

    /// Check whether the rule matches a host name.
    pub fn matches_domain(&self, domain: &str) -> bool {
        match &self.condition {
            Condition::All => true,
            Condition::Domain(d) => !domain.is_empty() && domain.eq_ignore_ascii_case(d),
            Condition::DomainSuffix(s) => {
                if domain.is_empty() {
                    return false;
                }
                let lower = domain.to_ascii_lowercase();
                lower == *s
                    || lower
                        .strip_suffix(s.as_str())
                        .is_some_and(|head| head.ends_with('.'))
            }
            Condition::Cidr(_) | Condition::Country(_) => false,
        }
    }

    /// Check whether the rule matches an IP address.
    ///
    /// Country rules consult `geo`. Without a reader a country rule never
    /// matches and the miss is logged as an error; `AclEngineBuilder::build`
    /// always loads a reader when a country rule is present.
    pub fn matches_ip(&self, ip: IpAddr, geo: Option<&dyn GeoIpReader>) -> bool {
        match &self.condition {
            Condition::All => true,
            Condition::Cidr(net) => net.contains(&ip),
            Condition::Country(code) => match geo {
                Some(reader) => reader
                    .country_code(ip)
                    .is_some_and(|c| c.eq_ignore_ascii_case(code)),
                None => {
                    tracing::error!(rule = %self, "country rule evaluated without a GeoIP database");
                    false
                }
            },
            Condition::Domain(_) | Condition::DomainSuffix(_) => false,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Hijack(target) => write!(f, "hijack {} {target}", self.condition),
            other => write!(f, "{} {}", other.keyword(), self.condition),
        }
    }
}

impl FromStr for Rule {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_rule(s)
    }
}
