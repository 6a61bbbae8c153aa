//! Engine configuration
//!
//! Loaded from the first file found among:
//! - an explicit path (`-c/--config`)
//! - `$JUNOS_ENGINE_CONFIG`
//! - `~/.junos-engine.toml`
//! - `./junos-engine.toml`
//!
//! followed by environment variable overrides. TOML, YAML and JSON are
//! accepted, chosen by file extension.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::ConnectionParams;
use crate::retry::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default device connection
    pub connection: ConnectionParams,

    /// Candidate lock retry policy
    pub lock: RetryPolicy,

    /// Offline staging
    pub offline: OfflineConfig,

    /// Session lifecycle
    pub session: SessionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Offline staging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Send every session to the artifact instead of a device
    pub enabled: bool,

    /// Artifact path
    pub artifact_path: Option<PathBuf>,
}

/// Session lifecycle settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pause after closing a session, for devices that rate-limit logins
    #[serde(with = "humantime_serde")]
    pub close_delay: Duration,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `-v` nor `RUST_LOG` is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the first available source
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::from_file(path)?
            }
            None => match Self::get_config_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => EngineConfig::default(),
            },
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Candidate config file locations, highest priority first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(env_config) = std::env::var("JUNOS_ENGINE_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".junos-engine.toml"));
        }
        paths.push(PathBuf::from("junos-engine.toml"));

        paths
    }

    /// Parse one file, format chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("JUNOS_HOST") {
            self.connection.host = host;
        }

        if let Ok(port) = std::env::var("JUNOS_PORT") {
            self.connection.port = port
                .parse()
                .with_context(|| format!("JUNOS_PORT is not a port number: {}", port))?;
        }

        if let Ok(user) = std::env::var("JUNOS_USERNAME") {
            self.connection.username = user;
        }

        if let Ok(password) = std::env::var("JUNOS_PASSWORD") {
            self.connection.password = Some(password);
        }

        if let Ok(file) = std::env::var("JUNOS_KEY_FILE") {
            self.connection.private_key_file = Some(PathBuf::from(file));
        }

        // JUNOS_OFFLINE_FILE switches offline mode on
        if let Ok(file) = std::env::var("JUNOS_OFFLINE_FILE") {
            self.offline.enabled = true;
            self.offline.artifact_path = Some(PathBuf::from(file));
        }

        if let Ok(level) = std::env::var("JUNOS_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Artifact path for offline sessions
    pub fn offline_artifact(&self) -> PathBuf {
        self.offline
            .artifact_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.set", self.default_artifact_stem())))
    }

    fn default_artifact_stem(&self) -> &str {
        if self.connection.host.is_empty() {
            "junos-offline"
        } else {
            &self.connection.host
        }
    }
}
