//! `check` and `match` subcommands.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use acl_dns::DnsResolver;
use acl_rules::{AclEngineBuilder, Decision, GeoIpReader, MaxmindReader};
use clap::Args;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, load_config};

/// Arguments for `acl-rs check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// ACL rule file to parse
    #[arg(short, long)]
    pub rules: PathBuf,
}

/// Arguments for `acl-rs match`.
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Config file path (toml)
    #[arg(short, long, default_value = "acl.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: MatchOverrides,

    /// Destinations to evaluate (host names or IP literals)
    #[arg(required = true)]
    pub destinations: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MatchOverrides {
    /// Override the ACL rule file
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Override the GeoIP database path
    #[arg(long)]
    pub geoip: Option<PathBuf>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Parse a rule file and report what it contains.
pub fn run_check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = AclEngineBuilder::new();
    builder.load_file(&args.rules)?;
    let geoip = if builder.needs_geoip() { "required" } else { "not required" };

    println!("{}: {} rules", args.rules.display(), builder.rule_count());
    println!("geoip: {geoip}");
    Ok(())
}

/// Build an engine from the config and evaluate each destination.
pub async fn run_match(args: MatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    config.apply_overrides(&args.overrides);
    config.validate()?;

    init_tracing(&config.logging);

    let resolver = Arc::new(DnsResolver::new(&config.dns)?);
    let mut builder = AclEngineBuilder::new();
    builder
        .load_file(&config.rules)?
        .set_default(config.default_action.clone())
        .cache_capacity(config.cache_size);

    let geoip_path = config.geoip.as_ref().map(|g| g.path.clone());
    let engine = builder.build(resolver, move || {
        let path = geoip_path.ok_or_else(|| {
            acl_rules::RulesError::GeoIp(
                "country rules require [geoip] path or --geoip".to_string(),
            )
        })?;
        let reader = MaxmindReader::from_file(&path)?;
        Ok(Arc::new(reader) as Arc<dyn GeoIpReader>)
    })?;

    for dest in &args.destinations {
        let decision = engine.resolve_and_match(dest).await;
        println!("{}", format_decision(dest, &decision));
    }
    Ok(())
}

/// Render `<dest> -> <action>[ <arg>] (domain|ip)[ addr=<addr>][ error=<err>]`.
fn format_decision(dest: &str, decision: &Decision) -> String {
    let mut parts = vec![
        dest.to_string(),
        "->".to_string(),
        decision.action.keyword().to_string(),
    ];
    if !decision.arg().is_empty() {
        parts.push(decision.arg().to_string());
    }
    parts.push(if decision.is_domain { "(domain)" } else { "(ip)" }.to_string());
    if let Some(addr) = &decision.addr {
        parts.push(format!("addr={addr}"));
    }
    if let Some(err) = &decision.error {
        parts.push(format!("error={err}"));
    }
    parts.join(" ")
}

fn init_tracing(config: &LoggingConfig) {
    let level = config.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format.as_deref().unwrap_or("pretty") {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
