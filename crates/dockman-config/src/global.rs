//! Global configuration for dockman
//!
//! Located at `~/.config/dockman/config.toml`

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global dockman configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub runtime: RuntimeConfig,
    pub dashboard: DashboardConfig,
    pub sessions: SessionsConfig,
    pub logging: LoggingConfig,
}

/// Connection to the container runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Docker socket path or URL (`unix://`, `tcp://`, `http://`)
    pub socket: String,
    /// Upper bound for a single request/response call, in seconds
    pub call_timeout_secs: u64,
    /// Grace period passed to the runtime on stop, in seconds.
    /// `None` lets the runtime use the container's own default.
    pub stop_timeout_secs: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            socket: default_docker_socket(),
            call_timeout_secs: 10,
            stop_timeout_secs: None,
        }
    }
}

#[cfg(windows)]
fn default_docker_socket() -> String {
    "//./pipe/docker_engine".to_string()
}

#[cfg(not(windows))]
fn default_docker_socket() -> String {
    "/var/run/docker.sock".to_string()
}

/// Dashboard timers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Interval between reconciliation passes
    pub poll_interval_ms: u64,
    /// Interval between redraws of open sessions
    pub render_interval_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            render_interval_ms: 500,
        }
    }
}

/// Log and shell session behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionsConfig {
    /// Maximum number of lines retained per session buffer
    pub buffer_lines: usize,
    /// Number of trailing lines the log filter searches
    pub filter_window: usize,
    /// How many lines of history to request when a log view opens
    pub log_tail: String,
    /// Ask the runtime to prefix each log line with its timestamp
    pub log_timestamps: bool,
    /// Shells tried in order when opening an exec session
    pub shell_candidates: Vec<String>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            buffer_lines: 1000,
            filter_window: 200,
            log_tail: "100".to_string(),
            log_timestamps: true,
            shell_candidates: vec![
                "/bin/bash".to_string(),
                "/bin/sh".to_string(),
                "/busybox/sh".to_string(),
            ],
        }
    }
}

/// Diagnostic logging
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file used while the dashboard owns the terminal.
    /// Defaults to `dockman.log` in the data directory.
    pub file: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "dockman_core=debug")
    pub level: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.clone(),
            source: e,
        })?;
        config.validate()?;

        tracing::debug!(
            "Loaded config from {:?}: socket={}, poll={}ms",
            path,
            config.runtime.socket,
            config.dashboard.poll_interval_ms
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.clone(),
            source: e,
        })
    }

    /// Reject values that would stall the dashboard
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.dashboard.render_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.render_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.runtime.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "runtime.call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sessions.buffer_lines == 0 {
            return Err(ConfigError::Invalid(
                "sessions.buffer_lines must be greater than zero".to_string(),
            ));
        }
        if self.sessions.shell_candidates.is_empty() {
            return Err(ConfigError::Invalid(
                "sessions.shell_candidates must name at least one shell".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.poll_interval_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.render_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.call_timeout_secs)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dockman").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dockman").ok_or(ConfigError::NoDataDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Log file for dashboard mode, honouring `logging.file`
    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.logging.file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("dockman.log")),
        }
    }
}
