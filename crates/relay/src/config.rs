//! Configuration management for the relay.
//!
//! This module handles loading, validation, and conversion of the relay
//! configuration from TOML (or JSON) files and command-line arguments.

use relay_core::ServerConnectionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Log levels accepted by `logging.level`.
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reassembly_timeout() -> u64 {
    relay_core::DEFAULT_REASSEMBLY_TIMEOUT.as_secs()
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to write default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Application configuration loaded from file.
///
/// Besides the relay's own sections this also accepts the JSON layout used by
/// existing bot deployments (`token`, `prefix` and friends are ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log every chunk received on every server
    #[serde(default)]
    pub debug: bool,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Chunk reassembly settings
    #[serde(default)]
    pub reassembly: ReassemblySettings,
    /// Backend servers, one listener each
    #[serde(default)]
    pub servers: Vec<ServerConnectionConfig>,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Reassembly buffer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassemblySettings {
    /// Seconds an incomplete split message is kept before it is discarded
    #[serde(default = "default_reassembly_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReassemblySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_reassembly_timeout(),
        }
    }
}

impl ReassemblySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            logging: LoggingSettings::default(),
            reassembly: ReassemblySettings::default(),
            servers: vec![ServerConnectionConfig::new(
                "Server 1",
                7777,
                "changeme",
                "000000000000000000",
            )],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    ///
    /// Files with a `.json` extension are read as JSON, anything else as
    /// TOML. If the file doesn't exist, a default TOML configuration is
    /// written to the specified path and returned.
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            if is_json(path) {
                Ok(serde_json::from_str(&content)?)
            } else {
                Ok(toml::from_str(&content)?)
            }
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Resolves the per-server connection configurations.
    ///
    /// The global `debug` flag switches debug output on for every server.
    pub fn to_server_configs(&self) -> Vec<ServerConnectionConfig> {
        self.servers
            .iter()
            .cloned()
            .map(|mut server| {
                server.debug |= self.debug;
                server
            })
            .collect()
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.servers.is_empty() {
            return Err("At least one server must be configured".to_string());
        }

        let mut names = HashSet::new();
        let mut ports = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err("Server name cannot be empty".to_string());
            }
            if server.password.is_empty() {
                return Err(format!("Server {} has an empty password", server.name));
            }
            if server.channel.trim().is_empty() {
                return Err(format!("Server {} has an empty channel", server.name));
            }
            if server.port == 0 {
                return Err(format!("Server {} must use a non-zero port", server.name));
            }
            if !names.insert(server.name.as_str()) {
                return Err(format!("Duplicate server name: {}", server.name));
            }
            if !ports.insert(server.port) {
                return Err(format!(
                    "Duplicate port {} (server {})",
                    server.port, server.name
                ));
            }
        }

        if self.reassembly.timeout_secs == 0 {
            return Err("reassembly.timeout_secs must be greater than 0".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{Builder, NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert!(!config.debug);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.reassembly.timeout_secs, 30);
        assert_eq!(config.servers.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());

        // The default file is written and loads back identically
        assert!(path.exists());
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_toml_file() {
        let toml_content = r#"
debug = true

[logging]
level = "debug"
json_format = true

[reassembly]
timeout_secs = 45

[[servers]]
name = "Arena"
port = 7777
password = "secret"
channel = "1234567890"

[[servers]]
name = "Deck"
port = 7778
password = "other"
channel = "1234567890"
bind_host = "127.0.0.1"
idle_timeout_secs = 300
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert!(config.debug);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.reassembly.timeout(), Duration::from_secs(45));
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].bind_address().to_string(), "0.0.0.0:7777");
        assert_eq!(config.servers[1].bind_address().to_string(), "127.0.0.1:7778");
        assert_eq!(config.servers[1].idle_timeout(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_legacy_json_file() {
        let json_content = r#"{
            "token": "discord-token",
            "prefix": "!",
            "debug": false,
            "servers": [
                { "name": "Arena", "port": 7777, "password": "secret", "channel": "1234567890" }
            ]
        }"#;

        let temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        fs::write(temp_file.path(), json_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.logging, LoggingSettings::default());
        assert_eq!(config.reassembly, ReassemblySettings::default());
        assert_eq!(
            config.servers,
            vec![ServerConnectionConfig::new("Arena", 7777, "secret", "1234567890")]
        );
    }

    #[tokio::test]
    async fn test_load_invalid_toml_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[[servers]]\nname = ").await.unwrap();

        let result = AppConfig::load_from_file(temp_file.path()).await;
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_global_debug_applies_to_all_servers() {
        let mut config = AppConfig::default();
        config.servers.push(ServerConnectionConfig::new("Deck", 7778, "pw", "42"));
        assert!(config.to_server_configs().iter().all(|server| !server.debug));

        config.debug = true;
        assert!(config.to_server_configs().iter().all(|server| server.debug));
    }

    #[test]
    fn test_validation_rejects_duplicate_ports() {
        let mut config = AppConfig::default();
        config.servers.push(ServerConnectionConfig::new("Deck", 7777, "pw", "42"));

        let result = config.validate();
        assert!(result.unwrap_err().contains("Duplicate port"));
    }

    #[test]
    fn test_validation_rejects_duplicate_names() {
        let mut config = AppConfig::default();
        config.servers.push(ServerConnectionConfig::new("Server 1", 7778, "pw", "42"));

        let result = config.validate();
        assert!(result.unwrap_err().contains("Duplicate server name"));
    }

    #[test]
    fn test_validation_rejects_empty_password_and_channel() {
        let mut config = AppConfig::default();
        config.servers[0].password.clear();
        assert!(config.validate().unwrap_err().contains("empty password"));

        let mut config = AppConfig::default();
        config.servers[0].channel = "  ".to_string();
        assert!(config.validate().unwrap_err().contains("empty channel"));
    }

    #[test]
    fn test_validation_rejects_missing_servers() {
        let mut config = AppConfig::default();
        config.servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid_level".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid log level"));
    }

    #[test]
    fn test_validation_valid_log_levels() {
        for level in &VALID_LOG_LEVELS {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();

            let result = config.validate();
            assert!(result.is_ok(), "Level '{}' should be valid", level);
        }
    }

    #[test]
    fn test_validation_rejects_zero_reassembly_timeout() {
        let mut config = AppConfig::default();
        config.reassembly.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
