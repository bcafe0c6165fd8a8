mod sites;

pub use sites::SitesConfig;

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Default loopback port for the extension bridge.
pub const DEFAULT_BRIDGE_PORT: u16 = 19333;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Extension bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Relay timing and retry policy
    #[serde(default)]
    pub relay: RelayConfig,

    /// Question site and settings page
    #[serde(default)]
    pub sites: SitesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// WebSocket port on 127.0.0.1
    #[serde(default = "default_bridge_port")]
    pub port: u16,

    /// How long to wait for the extension to answer one host command
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_bridge_port(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

fn default_bridge_port() -> u16 {
    DEFAULT_BRIDGE_PORT
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Delivery attempts per message, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between delivery attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Wait after focusing a destination tab before sending to it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Delay before focus returns to the previously active tab
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            restore_delay_ms: default_restore_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_restore_delay_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load with an explicit config file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Merge config file if exists
            .merge(Toml::file(path))
            // Merge environment variables (TABRELAY_RELAY__MAX_ATTEMPTS=5)
            .merge(Env::prefixed("TABRELAY_").split("__"))
            .extract()
            .map_err(|e| RelayError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabrelay")
            .join("config.toml")
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| RelayError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.relay.max_attempts == 0 {
            return Err(RelayError::ConfigError(
                "relay.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sites.question_url.trim().is_empty() {
            return Err(RelayError::ConfigError(
                "sites.question_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
