//! Configuration Management
//!
//! Handles persistent configuration storage for the `mistral` CLI.

use crate::poll::{PollConfig, DEFAULT_INTERVAL, DEFAULT_TIMEOUT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "MISTRAL_URL";
/// Environment variable holding the auth token
pub const TOKEN_ENV: &str = "OS_AUTH_TOKEN";

const DEFAULT_ENDPOINT: &str = "http://localhost:8989/v2";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Workflow service endpoint, e.g. `http://localhost:8989/v2`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Seconds between execution state checks
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Seconds before giving up on an execution
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mistral").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective endpoint (CLI > env > config > default)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|s| !s.is_empty()))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Get effective token (CLI > env)
    pub fn effective_token(cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|s| !s.is_empty()))
    }

    /// Poll timing from config, falling back to library defaults
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_INTERVAL),
            self.poll_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        )
    }

    /// Set endpoint and save
    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<()> {
        self.endpoint = Some(endpoint.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_endpoint_wins() {
        let config = Config {
            endpoint: Some("http://from-config/v2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.effective_endpoint(Some("http://from-cli/v2")),
            "http://from-cli/v2"
        );
    }

    #[test]
    fn test_poll_config_overrides() {
        let config = Config {
            poll_interval_secs: Some(5),
            ..Default::default()
        };
        let poll = config.poll_config();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("mistral-config-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = Config {
            endpoint: Some("http://localhost:8989/v2".to_string()),
            poll_interval_secs: Some(1),
            poll_timeout_secs: Some(30),
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_file_yields_default() {
        let dir = std::env::temp_dir().join(format!("mistral-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
