//! Runtime configuration types.

use std::time::Duration;

use crate::supervisor::StreamKind;

use super::ConfigError;

/// Line whose appearance on stdout marks the wrapped server as ready.
pub const DEFAULT_READINESS_MARKER: &str = "Type help for list of commands.";

/// Period between health pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// How long the child gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for one supervised child process.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Path to the child executable.
    pub command: String,
    /// Arguments passed to the child, in order.
    pub args: Vec<String>,
    /// Substring that marks the child as ready.
    pub readiness_marker: String,
    /// Period between health pings.
    pub heartbeat_interval: Duration,
    /// Streams scanned for the readiness marker.
    pub trigger_streams: Vec<StreamKind>,
    /// Grace period for the child when the supervisor itself fails.
    pub terminate_timeout: Duration,
}

impl SupervisorConfig {
    /// Create a configuration for `command` with default settings.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            readiness_marker: DEFAULT_READINESS_MARKER.to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            trigger_streams: vec![StreamKind::Stdout],
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_readiness_marker(mut self, marker: impl Into<String>) -> Self {
        self.readiness_marker = marker.into();
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_trigger_streams(mut self, streams: Vec<StreamKind>) -> Self {
        self.trigger_streams = streams;
        self
    }

    #[must_use]
    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    /// Whether `stream` is scanned for the readiness marker.
    #[must_use]
    pub fn is_trigger(&self, stream: StreamKind) -> bool {
        self.trigger_streams.contains(&stream)
    }

    /// Check the configuration before anything is started.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCommand` for an empty command,
    /// `ConfigError::EmptyMarker` for an empty readiness marker,
    /// `ConfigError::ZeroInterval` for a zero heartbeat interval and
    /// `ConfigError::NoTriggerStream` when no stream is scanned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::MissingCommand);
        }
        if self.readiness_marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.trigger_streams.is_empty() {
            return Err(ConfigError::NoTriggerStream);
        }
        Ok(())
    }
}

/// Split the raw `--args` value into the child's argument list.
///
/// Surrounding whitespace and outer single quotes are stripped before
/// splitting on whitespace. An empty value yields no arguments.
#[must_use]
pub fn parse_child_args(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .trim_matches('\'')
        .split_whitespace()
        .map(String::from)
        .collect()
}
