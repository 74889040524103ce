//! DNS resolution for the ACL engine.
//!
//! [`DnsResolver`] is a shared, caching resolver backed by
//! [`hickory-resolver`](https://crates.io/crates/hickory-resolver). It
//! implements [`acl_rules::Resolve`] so it can be handed straight to
//! [`acl_rules::AclEngineBuilder::build`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use acl_dns::{DnsConfig, DnsResolver};
//!
//! # async fn example() -> Result<(), acl_dns::DnsError> {
//! let resolver = DnsResolver::new(&DnsConfig::default())?;
//! let ip = resolver.lookup("example.com").await?;
//! println!("resolved: {ip}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod resolver;

pub use config::{DnsConfig, DnsStrategy};
pub use error::DnsError;
pub use resolver::DnsResolver;
