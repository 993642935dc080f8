//! Configuration for the gaze stream CLI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preferred device URL; the first discovered device when unset.
    pub device_url: Option<String>,

    /// Bound of the engine-to-dispatch sample queue.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_url: None,
            queue_capacity: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaze-stream-client")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.device_url.is_none());
        assert_eq!(config.queue_capacity, 10_000);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config {
            device_url: Some("tobii-ttp://device-0".to_string()),
            queue_capacity: 512,
        };
        let json = serde_json::to_string(&config).expect("serializes");
        let parsed: Config = serde_json::from_str(&json).expect("parses");
        assert_eq!(parsed.device_url.as_deref(), Some("tobii-ttp://device-0"));
        assert_eq!(parsed.queue_capacity, 512);
    }
}
