//! Configuration management for the BlockWords service.
//!
//! This module handles loading and validation of the service configuration
//! from TOML files. The session layout itself is a
//! [`cube_session::SessionConfig`] embedded under `[session]`.

use cube_session::{GameParams, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "blockwords".to_string()
}

fn default_keep_alive_s() -> u64 {
    5
}

fn default_channel_capacity() -> usize {
    256
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// Default tick interval for the dispatch loop
fn default_tick_interval_ms() -> u64 {
    100
}

fn default_event_buffer() -> usize {
    64
}

fn default_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Broker connection settings
    #[serde(default)]
    pub broker: BrokerSettings,
    /// Dispatch loop settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
    /// Station layout and start timing
    #[serde(default)]
    pub session: SessionConfig,
    /// Parameters used until the first `game/start` arrives
    #[serde(default)]
    pub game: GameParams,
    /// Letter and dictionary sources
    #[serde(default)]
    pub words: WordSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// MQTT keep-alive in seconds
    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,
    /// Capacity of the client request queue and the outbound queue
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Pause before polling again after a connection error
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            keep_alive_s: default_keep_alive_s(),
            channel_capacity: default_channel_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// How often the coordinator clock ticks, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Session events buffered per slow subscriber
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Letter pool and dictionary settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSettings {
    /// Newline-separated word list; without one every guess is judged bad
    #[serde(default)]
    pub word_list: Option<String>,
    /// Fixed seed for reproducible letter deals
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration settings.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or `Err(String)` describing the
    /// first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.broker.host.trim().is_empty() {
            return Err("Broker host cannot be empty".to_string());
        }
        if self.broker.port == 0 {
            return Err("Broker port must be greater than 0".to_string());
        }
        if self.broker.client_id.trim().is_empty() {
            return Err("Broker client_id cannot be empty".to_string());
        }
        if self.broker.channel_capacity == 0 {
            return Err("broker.channel_capacity must be greater than 0".to_string());
        }
        if self.runtime.tick_interval_ms == 0 {
            return Err("runtime.tick_interval_ms must be greater than 0".to_string());
        }
        if self.runtime.event_buffer == 0 {
            return Err("runtime.event_buffer must be greater than 0".to_string());
        }

        self.session
            .validate()
            .map_err(|e| format!("Invalid session layout: {e}"))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_session::types::DeviceId;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.session.stations.len(), 2);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.broker.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));

        let mut config = AppConfig::default();
        config.session.stations[1].devices[2] = DeviceId(3);
        assert!(config.validate().unwrap_err().contains("session layout"));
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[broker]
host = "cubes.local"

[session]
designated_prompts = true

[[session.stations]]
id = 0
devices = [21, 22, 23, 24, 25, 26]

[game]
min_win_score = 30
descent_duration = 90

[words]
seed = 7
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.broker.host, "cubes.local");
        assert_eq!(config.broker.port, 1883);
        assert!(config.session.designated_prompts);
        assert_eq!(config.session.stations.len(), 1);
        assert_eq!(config.session.stations[0].devices[0], DeviceId(21));
        assert_eq!(config.game.min_win_score, 30);
        assert_eq!(config.game.descent_duration_s, 90);
        assert_eq!(config.words.seed, Some(7));
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_missing_file_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockwords.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.broker, BrokerSettings::default());

        // The written file loads back to the same layout
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.session, config.session);
        assert_eq!(reloaded.game, config.game);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[broker\nport = ").unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }
}
