use crate::history::DEFAULT_HISTORY_WINDOW;
use crate::log_debug;
use crate::providers::{PROVIDER_OPTION_KEY, ProviderKind};

use anyhow::{Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings key for the sliding-window size
pub const HISTORY_WINDOW_KEY: &str = "session.historyWindow";
/// Settings key for the provider call timeout
pub const TIMEOUT_SECONDS_KEY: &str = "session.timeoutSeconds";

/// Read-only access to host settings by dotted key
pub trait ConfigResolver: Send + Sync {
    fn get_config_value(&self, key: &str) -> Option<String>;
}

impl<S: std::hash::BuildHasher + Send + Sync> ConfigResolver for HashMap<String, String, S> {
    fn get_config_value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Configuration structure for CodeBuddy
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    /// Active provider name; empty means none selected
    #[serde(default)]
    pub provider: String,
    /// Provider-specific configurations, keyed by lowercase provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Session memory settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Provider-specific configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProviderConfig {
    /// API key for the provider
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Session memory configuration
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SessionConfig {
    /// Turns kept per provider history
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Hours a conversation survives without activity
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Provider call timeout; 0 waits indefinitely
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            ttl_hours: default_ttl_hours(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_timeout_seconds() -> u64 {
    120
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

impl Config {
    /// Load the configuration from the user config file
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let config = Self::load_from(&config_path)?;
        log_debug!("Configuration loaded from {}", config_path.display());
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            anyhow!(
                "Invalid configuration file {}: {}. Please check it for syntax errors.",
                path.display(),
                e
            )
        })
    }

    /// Save the configuration to the user config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        log_debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("codebuddy");
        path.push("config.toml");
        Ok(path)
    }

    /// Update the configuration with new values
    pub fn update(
        &mut self,
        provider: Option<ProviderKind>,
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<()> {
        if let Some(kind) = provider {
            self.provider = kind.name().to_string();
        }

        let kind: ProviderKind = self
            .provider
            .parse()
            .map_err(|_| anyhow!("Select a provider before setting credentials or models"))?;
        let provider_config = self
            .providers
            .entry(provider_key(kind))
            .or_insert_with(|| ProviderConfig::default_for(kind));

        if let Some(key) = api_key {
            provider_config.api_key = key;
        }
        if let Some(model) = model {
            provider_config.model = model;
        }
        if let Some(url) = base_url {
            provider_config.base_url = Some(url);
        }

        log_debug!("Configuration updated, active provider: {}", self.provider);
        Ok(())
    }

    /// Get the configuration for a specific provider
    pub fn get_provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.get(&provider_key(kind))
    }

    /// Credential for `kind`, environment variable first
    fn credential_for(&self, kind: ProviderKind) -> Option<String> {
        std::env::var(kind.api_key_env())
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.get_provider_config(kind)
                    .map(|config| config.api_key.clone())
            })
    }
}

impl ConfigResolver for Config {
    fn get_config_value(&self, key: &str) -> Option<String> {
        if key == PROVIDER_OPTION_KEY {
            return Some(self.provider.clone()).filter(|p| !p.is_empty());
        }
        if key == HISTORY_WINDOW_KEY {
            return Some(self.session.history_window.to_string());
        }
        if key == TIMEOUT_SECONDS_KEY {
            return Some(self.session.timeout_seconds.to_string());
        }

        ProviderKind::ALL.iter().find_map(|kind| {
            if key == kind.api_key_key() {
                self.credential_for(*kind)
            } else if key == kind.model_key() {
                self.get_provider_config(*kind)
                    .map(|config| config.model.clone())
            } else if key == kind.base_url_key() {
                self.get_provider_config(*kind)
                    .and_then(|config| config.base_url.clone())
            } else {
                None
            }
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let providers = ProviderKind::ALL
            .iter()
            .map(|kind| (provider_key(*kind), ProviderConfig::default_for(*kind)))
            .collect();

        Self {
            provider: String::new(),
            providers,
            session: SessionConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Create a default provider configuration for a given provider
    pub fn default_for(kind: ProviderKind) -> Self {
        Self {
            api_key: String::new(),
            model: kind.default_model().to_string(),
            base_url: None,
        }
    }
}

fn provider_key(kind: ProviderKind) -> String {
    kind.name().to_lowercase()
}
