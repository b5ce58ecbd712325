// src/cfg/config.rs

use eyre::{eyre, Result};
use log::{debug, error};
use secure_string::SecureString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cfg::secure;
use crate::sync::DEFAULT_FETCH_LIMIT;

pub const CONFIG_FILE: &str = "mailbox-leads.yml";
pub const DEFAULT_STORE_PATH: &str = "data/db.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(alias = "api-key", default, deserialize_with = "secure::deserialize_opt")]
    pub api_key: Option<SecureString>,

    #[serde(default)]
    pub model: Option<String>,

    /// Override for the API host, e.g. a local proxy.
    #[serde(alias = "base-url", default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderSettings,
    pub cerebras: ProviderSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "store-path")]
    pub store_path: PathBuf,

    /// Messages fetched per sync when the caller gives no limit.
    #[serde(alias = "sync-limit")]
    pub sync_limit: u32,

    /// Upper bound on any single IMAP, DNS or LLM call.
    #[serde(alias = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            sync_limit: DEFAULT_FETCH_LIMIT,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Where to look when no `--config` was given: the working directory, then the
/// user config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("mailbox-leads").join(CONFIG_FILE))
        .filter(|p| p.exists())
}

/// Load from an explicit path (must exist), else from the default locations,
/// else fall back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => {
                debug!("No config file found; using defaults");
                return Ok(Config::default());
            }
        },
    };
    debug!("Loading configuration from {:?}", path);

    let content = fs::read_to_string(&path).map_err(|e| {
        error!("Failed to read config file {}: {}", path.display(), e);
        eyre!("Failed to read config file {}: {}", path.display(), e)
    })?;

    let cfg = parse_config(&content)?;
    debug!("Successfully loaded configuration");
    Ok(cfg)
}

pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|e| {
        error!("Failed to parse YAML: {}", e);
        eyre!("Failed to parse YAML: {}", e)
    })
}
