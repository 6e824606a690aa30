//! Configuration management for xwrite

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::credentials::CredentialConfig;
use crate::error::{ConfigError, Result};
use crate::rate_limiter::DEFAULT_DAILY_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub credentials: Option<CredentialConfig>,
    #[serde(default)]
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "~/.local/share/xwrite/state.toml".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Posts allowed per 24 hour epoch
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing config file is not an error; the defaults are used instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            state: StateConfig::default(),
            credentials: Some(CredentialConfig::default()),
            quota: QuotaConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.state.path.trim().is_empty() {
            return Err(ConfigError::MissingField("state.path".to_string()).into());
        }
        if self.quota.daily_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "quota.daily_limit".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// State file path with `~` expanded
    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state.path).to_string())
    }

    /// Credential configuration, falling back to the defaults
    pub fn credential_config(&self) -> CredentialConfig {
        self.credentials.clone().unwrap_or_default()
    }
}

/// Resolve the configuration file path (XDG config dir unless `XWRITE_CONFIG` is set)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("XWRITE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("xwrite").join("config.toml"))
}
