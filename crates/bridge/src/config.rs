//! Bridge configuration management

use crate::dispatcher::DispatchSettings;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port of the gateway's API socket
///
/// The gateway itself serves this port over TLS only; the plain TCP
/// transport reaches it through a TLS-terminating proxy.
pub const DEFAULT_PORT: u16 = 51200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub protocol: ProtocolSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Host name or IP address of the gateway
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub connect_timeout_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: "velux-klf-200".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Deadline for one command, from request to terminal answer
    pub command_timeout_secs: u64,
    /// How long a read may stay silent before the gateway counts as idle
    pub idle_read_timeout_ms: u64,
    /// Wait for the end of each session before the next command
    pub sequential_mode: bool,
    /// Ignore functional parameters reported in node information
    pub discard_product_functional_parameters: bool,
    /// Ignore functional parameters reported in position changes
    pub discard_update_functional_parameters: bool,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: 60,
            idle_read_timeout_ms: 2000,
            sequential_mode: false,
            discard_product_functional_parameters: true,
            discard_update_functional_parameters: true,
        }
    }
}

impl BridgeConfig {
    /// `host:port` of the gateway
    pub fn address(&self) -> String {
        format!("{}:{}", self.bridge.host, self.bridge.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.connect_timeout_secs)
    }

    pub fn idle_read_timeout(&self) -> Duration {
        Duration::from_millis(self.protocol.idle_read_timeout_ms)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            command_timeout: Duration::from_secs(self.protocol.command_timeout_secs),
            sequential_mode: self.protocol.sequential_mode,
            discard_functional_parameters: self.protocol.discard_update_functional_parameters,
        }
    }

    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/klf-bridge/bridge.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        tracing::debug!(
            "Config: gateway {}, sequential mode {}",
            config.address(),
            config.protocol.sequential_mode
        );
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                // Print to stderr since logging might not be initialized yet
                eprintln!("Config: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("klf-bridge").join("bridge.toml")
        } else {
            PathBuf::from(".config/klf-bridge/bridge.toml")
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.bridge.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.bridge.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.bridge.host.trim().is_empty() {
            return Err(anyhow!("Gateway host must not be empty"));
        }

        if self.bridge.port == 0 {
            return Err(anyhow!("Gateway port must not be 0"));
        }

        if self.protocol.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

/// Load configuration from a user supplied path, expanding `~`
pub fn load_config(path: &str) -> Result<BridgeConfig> {
    BridgeConfig::load(Some(expand_path(path)))
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge.log_level, "info");
        assert_eq!(config.bridge.port, DEFAULT_PORT);
        assert_eq!(config.protocol.command_timeout_secs, 60);
        assert!(!config.protocol.sequential_mode);
        assert!(config.protocol.discard_product_functional_parameters);
    }

    #[test]
    fn test_config_serialization() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BridgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: BridgeConfig = toml::from_str(
            r#"
            [bridge]
            host = "192.168.1.50"

            [protocol]
            sequential_mode = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.address(), "192.168.1.50:51200");
        assert!(parsed.protocol.sequential_mode);
        assert_eq!(parsed.protocol.idle_read_timeout_ms, 2000);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = BridgeConfig::default();
        assert!(config.validate().is_ok());

        config.bridge.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.bridge.log_level = "trace".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_port_and_timeout() {
        let mut config = BridgeConfig::default();
        config.bridge.port = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.protocol.command_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.bridge.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dispatch_settings() {
        let mut config = BridgeConfig::default();
        config.protocol.command_timeout_secs = 5;
        config.protocol.discard_update_functional_parameters = false;
        let settings = config.dispatch_settings();
        assert_eq!(settings.command_timeout, Duration::from_secs(5));
        assert!(!settings.discard_functional_parameters);
    }

    #[test]
    fn test_expand_path_keeps_absolute() {
        assert_eq!(expand_path("/etc/klf-bridge/bridge.toml"), PathBuf::from("/etc/klf-bridge/bridge.toml"));
    }
}
