//! Configuration file loader.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::DEFAULT_REQUEST_TIMEOUT;
use crate::supervisor::StreamKind;

use super::SupervisorConfig;

/// Settings loaded from a TOML file.
///
/// Every field is optional; unset fields keep the built-in defaults and
/// command-line flags override whatever the file sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Substring that marks the child as ready.
    pub readiness_marker: Option<String>,
    /// Period between health pings, in milliseconds.
    pub heartbeat_interval_ms: Option<u64>,
    /// Streams scanned for the readiness marker.
    pub trigger_streams: Option<Vec<StreamKind>>,
    /// Grace period for the child on supervisor failure, in milliseconds.
    pub terminate_timeout_ms: Option<u64>,
    /// Control plane connection settings.
    pub control_plane: ControlPlaneConfig,
}

impl FileConfig {
    /// Layer the file settings over `config`.
    #[must_use]
    pub fn apply(&self, mut config: SupervisorConfig) -> SupervisorConfig {
        if let Some(marker) = &self.readiness_marker {
            config.readiness_marker.clone_from(marker);
        }
        if let Some(ms) = self.heartbeat_interval_ms {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(streams) = &self.trigger_streams {
            config.trigger_streams.clone_from(streams);
        }
        if let Some(ms) = self.terminate_timeout_ms {
            config.terminate_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// Control plane connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Sidecar base URL. Derived from `AGONES_SDK_HTTP_PORT` when unset.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ControlPlaneConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(".readiness-wrapper.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("readiness-wrapper").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_from_path(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(FileConfig::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<FileConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while building the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing -i path to the server executable")]
    MissingCommand,

    #[error("readiness marker must not be empty")]
    EmptyMarker,

    #[error("heartbeat interval must be greater than zero")]
    ZeroInterval,

    #[error("at least one trigger stream is required")]
    NoTriggerStream,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
