//! Access-control decision engine for proxies.
//!
//! Given a destination (host name or IP literal), the engine evaluates an
//! ordered list of ACL rules and decides whether to connect directly, go
//! through the proxy, block, or hijack the connection to a substitute
//! address. Decisions are cached per destination.
//!
//! # Architecture
//!
//! - **Rules**: `Rule` pairs a `Condition` (domain, domain suffix, CIDR,
//!   country, all) with an `Action`
//! - **Parser**: line-oriented ACL files (`parser::parse_acl`)
//! - **Collaborators**: `Resolve` (DNS) and `GeoIpReader` (country lookup)
//!   are injected trait objects
//! - **Engine**: `AclEngine` scans rules first-match-wins and memoizes the
//!   result in a bounded TinyLFU/LRU cache
//!
//! # Example
//!
//! ```
//! use std::net::IpAddr;
//! use std::sync::Arc;
//!
//! use acl_rules::{AclEngineBuilder, Action, Resolve, ResolveError, RulesError};
//! use acl_rules::parser::parse_acl;
//!
//! struct NoDns;
//!
//! #[async_trait::async_trait]
//! impl Resolve for NoDns {
//!     async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
//!         Err(ResolveError::new(host, "offline"))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut builder = AclEngineBuilder::new();
//! builder.add_rules(parse_acl("block domain-suffix ads.example\ndirect cidr 10.0.0.0/8").unwrap());
//! builder.set_default(Action::Proxy);
//! let engine = builder
//!     .build(Arc::new(NoDns), || Err(RulesError::GeoIp("unused".into())))
//!     .unwrap();
//!
//! assert_eq!(engine.resolve_and_match("tracker.ads.example").await.action, Action::Block);
//! assert_eq!(engine.resolve_and_match("10.1.2.3").await.action, Action::Direct);
//! assert_eq!(engine.resolve_and_match("example.org").await.action, Action::Proxy);
//! # });
//! ```

mod cache;
pub mod engine;
pub mod error;
pub mod geoip;
pub mod parser;
pub mod resolve;
pub mod rule;

pub use cache::DEFAULT_CACHE_CAPACITY;
pub use engine::{AclEngine, AclEngineBuilder, Decision};
pub use error::{BoxError, ResolveError, RulesError};
#[cfg(feature = "geoip")]
pub use geoip::MaxmindReader;
pub use geoip::GeoIpReader;
pub use resolve::{parse_ip_zone, HostAddr, Resolve};
pub use rule::{Action, Condition, Rule};
