//! Common types for the runtime client

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

/// Label Compose attaches to every container of a project
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// Container ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The 12 character form shown by `docker ps`
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Container state as reported by the runtime's `State` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Restarting => write!(f, "restarting"),
            Self::Removing => write!(f, "removing"),
            Self::Exited => write!(f, "exited"),
            Self::Dead => write!(f, "dead"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for ContainerState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

/// A published or exposed port from a container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: String,
    pub ip: Option<String>,
}

/// Raw container descriptor from a list call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Names as reported, usually with a leading `/`
    pub names: Vec<String>,
    pub image: String,
    pub state: ContainerState,
    /// Human status text, e.g. "Up 3 minutes" or "Exited (0) 2 hours ago"
    pub status: String,
    pub ports: Vec<PortMapping>,
    /// Unix seconds
    pub created: i64,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    /// First reported name without its leading slash
    pub fn display_name(&self) -> String {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Compose project label, if any
    pub fn compose_project(&self) -> Option<&str> {
        self.labels
            .get(COMPOSE_PROJECT_LABEL)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Case-insensitive project membership check
    pub fn in_project(&self, project: &str) -> bool {
        self.compose_project()
            .map(|p| p.eq_ignore_ascii_case(project.trim()))
            .unwrap_or(false)
    }
}

/// Detailed container information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub created: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub exit_code: Option<i64>,
    pub restart_count: Option<i64>,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub mounts: Vec<MountInfo>,
    pub ports: Vec<PortMapping>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountInfo {
    pub mount_type: String,
    pub source: String,
    pub destination: String,
    pub read_only: bool,
}

/// Exec configuration
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    /// Command to execute
    pub cmd: Vec<String>,
    /// Environment variables as `KEY=value`
    pub env: Vec<String>,
    /// Working directory
    pub working_dir: Option<String>,
    /// User to run as
    pub user: Option<String>,
    /// Allocate TTY
    pub tty: bool,
    /// Attach stdin
    pub stdin: bool,
}

impl ExecConfig {
    /// Non-interactive command whose output is collected
    pub fn command<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Interactive shell with a TTY and stdin attached
    pub fn interactive_shell(shell: &str) -> Self {
        Self {
            cmd: vec![shell.to_string()],
            env: vec!["TERM=xterm-256color".to_string()],
            tty: true,
            stdin: true,
            ..Default::default()
        }
    }
}

/// Result of exec command
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code
    pub exit_code: i64,
    /// Combined stdout/stderr output
    pub output: String,
}

/// Interactive exec stream with stdin and combined output
pub struct ExecStream {
    pub stdin: Option<Pin<Box<dyn AsyncWrite + Send>>>,
    pub output: Pin<Box<dyn AsyncRead + Send>>,
    pub id: String,
}

impl std::fmt::Debug for ExecStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecStream")
            .field("id", &self.id)
            .field("stdin", &self.stdin.is_some())
            .finish()
    }
}

/// Log configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Follow log output
    pub follow: bool,
    /// Show stdout
    pub stdout: bool,
    /// Show stderr
    pub stderr: bool,
    /// Number of lines from the end, or "all"
    pub tail: String,
    /// Prefix each line with its timestamp
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            follow: false,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            timestamps: false,
        }
    }
}

/// Stream of log text, decoded one line at a time
pub struct LogStream {
    reader: BufReader<Pin<Box<dyn AsyncRead + Send>>>,
    scratch: Vec<u8>,
}

impl LogStream {
    /// Wrap a reader that already yields plain text bytes
    pub fn new(stream: Pin<Box<dyn AsyncRead + Send>>) -> Self {
        Self {
            reader: BufReader::new(stream),
            scratch: Vec::new(),
        }
    }

    /// Wrap a reader carrying the runtime's multiplexed frame format
    pub fn multiplexed<R>(raw: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::new(Box::pin(crate::demux::Demuxer::new(raw)))
    }

    /// Next line with its terminator removed. Invalid UTF-8 is replaced,
    /// never rejected. `None` once the stream has ended.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.scratch.clear();
        let read = self.reader.read_until(b'\n', &mut self.scratch).await?;
        if read == 0 {
            return Ok(None);
        }
        while matches!(self.scratch.last(), Some(b'\n') | Some(b'\r')) {
            self.scratch.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.scratch).into_owned()))
    }
}

/// Outcome of a lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The runtime performed the change
    Applied,
    /// The container was already in the requested state
    AlreadyDone,
}

/// Runtime information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub endpoint: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
