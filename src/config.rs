//! TOML configuration for the `acl-rs` binary.

use std::{
    fs,
    path::{Path, PathBuf},
};

use acl_dns::DnsConfig;
use acl_rules::{Action, DEFAULT_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::cli::MatchOverrides;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ACL rule file. Relative paths resolve against the config file.
    pub rules: PathBuf,
    #[serde(default = "default_action")]
    pub default_action: Action,
    /// Decision cache capacity.
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    #[serde(default)]
    pub geoip: Option<GeoipConfig>,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoipConfig {
    /// MaxMind database (`.mmdb`). Only opened when a rule uses `country`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
}

fn default_action() -> Action {
    Action::Proxy
}

fn default_cache_size() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&data)?;
    if let Some(base) = path.parent() {
        config.rebase(base);
    }
    Ok(config)
}

impl Config {
    /// Make relative file paths relative to `base`.
    fn rebase(&mut self, base: &Path) {
        if self.rules.is_relative() {
            self.rules = base.join(&self.rules);
        }
        if let Some(geoip) = &mut self.geoip
            && geoip.path.is_relative()
        {
            geoip.path = base.join(&geoip.path);
        }
    }

    /// Apply command-line overrides. Override paths are used as given.
    pub fn apply_overrides(&mut self, overrides: &MatchOverrides) {
        if let Some(rules) = &overrides.rules {
            self.rules = rules.clone();
        }
        if let Some(path) = &overrides.geoip {
            self.geoip = Some(GeoipConfig { path: path.clone() });
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = Some(level.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.as_os_str().is_empty() {
            return Err(ConfigError::Validation("rules path is empty".into()));
        }
        if self.cache_size == 0 {
            return Err(ConfigError::Validation(
                "cache_size must be greater than 0".into(),
            ));
        }
        if let Some(format) = &self.logging.format
            && !matches!(format.as_str(), "pretty" | "compact" | "json")
        {
            return Err(ConfigError::Validation(format!(
                "unknown logging format: {format}"
            )));
        }
        self.dns
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}
