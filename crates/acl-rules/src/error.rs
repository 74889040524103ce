//! Error types for the ACL engine.

use thiserror::Error;

/// Boxed error used as the source of resolver failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while loading rules or building the engine.
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid condition type: {0}")]
    InvalidCondition(String),

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    #[error("no hijack destination for {0}")]
    MissingHijackTarget(String),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<RulesError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("geoip error: {0}")]
    GeoIp(String),
}

/// A failed DNS lookup, surfaced to callers next to the decision.
#[derive(Error, Debug)]
#[error("failed to resolve {host}: {source}")]
pub struct ResolveError {
    pub host: String,
    #[source]
    pub source: BoxError,
}

impl ResolveError {
    pub fn new(host: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            host: host.into(),
            source: source.into(),
        }
    }
}
