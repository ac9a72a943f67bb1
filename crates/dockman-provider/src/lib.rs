//! Container runtime client for dockman
//!
//! This crate shields the rest of dockman from the Docker Engine API: typed
//! request/response calls, log streams with their frame headers removed, and
//! exec sessions opened against a fallback list of shells.

pub mod demux;
mod docker;
mod error;
mod exec;
mod types;

pub use docker::DockerRuntime;
pub use error::*;
pub use exec::*;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Trait for container runtimes
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers; `all` includes stopped ones
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Get detailed information about a container
    async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails>;

    /// Start a container
    async fn start(&self, id: &ContainerId) -> Result<ActionOutcome>;

    /// Stop a container, waiting up to `timeout` seconds before killing it
    async fn stop(&self, id: &ContainerId, timeout: Option<u32>) -> Result<ActionOutcome>;

    /// Restart a container
    async fn restart(&self, id: &ContainerId, timeout: Option<u32>) -> Result<ActionOutcome>;

    /// Remove a container
    async fn remove(&self, id: &ContainerId, force: bool) -> Result<ActionOutcome>;

    /// Execute a command in a running container and collect its output
    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecResult>;

    /// Execute a command with interactive I/O streams
    async fn exec_interactive(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecStream>;

    /// Open a log stream. Each call opens a new stream; with `follow` it
    /// never ends on its own.
    async fn logs(&self, id: &ContainerId, config: &LogConfig) -> Result<LogStream>;

    /// Check if the runtime is reachable
    async fn ping(&self) -> Result<()>;

    /// Describe the connected runtime
    fn info(&self) -> RuntimeInfo;
}

/// Lifecycle intents whose "already there" answers count as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
    Remove,
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Restart => write!(f, "restart"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Fold a raw runtime answer into an [`ActionOutcome`].
///
/// 304 means the container was already started or stopped. A missing
/// container satisfies stop and remove. A removal already in progress
/// satisfies remove.
pub fn settle_action(action: LifecycleAction, result: Result<()>) -> Result<ActionOutcome> {
    match result {
        Ok(()) => Ok(ActionOutcome::Applied),
        Err(ProviderError::Protocol { status: 304, .. })
            if matches!(action, LifecycleAction::Start | LifecycleAction::Stop) =>
        {
            Ok(ActionOutcome::AlreadyDone)
        }
        Err(ProviderError::NotFound(_))
            if matches!(action, LifecycleAction::Stop | LifecycleAction::Remove) =>
        {
            Ok(ActionOutcome::AlreadyDone)
        }
        Err(ProviderError::Protocol {
            status: 409,
            message,
        }) if action == LifecycleAction::Remove && message.contains("already in progress") => {
            Ok(ActionOutcome::AlreadyDone)
        }
        Err(ProviderError::ContainerNotRunning(_)) if action == LifecycleAction::Stop => {
            Ok(ActionOutcome::AlreadyDone)
        }
        Err(e) => Err(e),
    }
}

/// Connect to the runtime named in the global config
pub async fn create_runtime(
    config: &dockman_config::GlobalConfig,
) -> Result<Arc<dyn ContainerRuntime>> {
    let socket = config.runtime.socket.as_str();
    match DockerRuntime::connect(socket).await {
        Ok(runtime) => Ok(Arc::new(runtime)),
        Err(e) => {
            let path = socket.trim_start_matches("unix://");
            let socket_exists = std::path::Path::new(path).exists();
            Err(ProviderError::ConnectionFailed(format_connection_error(
                socket,
                socket_exists,
                &e,
            )))
        }
    }
}

/// Build a runtime for the dashboard without requiring the daemon to be up.
/// Unreachable daemons surface later as failed polls.
pub fn open_runtime(config: &dockman_config::GlobalConfig) -> Result<Arc<dyn ContainerRuntime>> {
    let runtime = DockerRuntime::open(&config.runtime.socket)?;
    Ok(Arc::new(runtime))
}

/// Format a helpful connection error message with actionable instructions
fn format_connection_error(socket: &str, socket_exists: bool, underlying: &ProviderError) -> String {
    let mut msg = String::from("Cannot connect to Docker\n\n");

    let local_socket = !socket.contains("://") || socket.starts_with("unix://");
    if local_socket && !socket_exists {
        msg.push_str(&format!(
            "The Docker API socket was not found at:\n  {}\n\n",
            socket
        ));
        msg.push_str("To start Docker, run:\n");
        msg.push_str("  sudo systemctl enable --now docker\n");
        msg.push_str("Or point dockman elsewhere with --socket or runtime.socket in the config file.\n");
    } else {
        msg.push_str(&format!(
            "The endpoint {} is configured but the daemon is not responding.\n\n",
            socket
        ));
        msg.push_str(&format!("Underlying error: {}\n", underlying));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(status: u16, message: &str) -> ProviderError {
        ProviderError::Protocol {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_already_started_is_success() {
        let outcome = settle_action(LifecycleAction::Start, Err(protocol(304, ""))).unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyDone);
    }

    #[test]
    fn test_already_stopped_is_success() {
        let outcome = settle_action(LifecycleAction::Stop, Err(protocol(304, ""))).unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyDone);
        let outcome = settle_action(
            LifecycleAction::Stop,
            Err(ProviderError::NotFound("gone".into())),
        )
        .unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyDone);
    }

    #[test]
    fn test_already_removed_is_success() {
        let outcome = settle_action(
            LifecycleAction::Remove,
            Err(ProviderError::NotFound("No such container".into())),
        )
        .unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyDone);

        let outcome = settle_action(
            LifecycleAction::Remove,
            Err(protocol(409, "removal of container abc is already in progress")),
        )
        .unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyDone);
    }

    #[test]
    fn test_real_failures_propagate() {
        assert!(settle_action(LifecycleAction::Start, Err(protocol(500, "boom"))).is_err());
        assert!(settle_action(
            LifecycleAction::Start,
            Err(ProviderError::NotFound("gone".into()))
        )
        .is_err());
        assert!(settle_action(
            LifecycleAction::Remove,
            Err(ProviderError::Transport("refused".into()))
        )
        .is_err());
        assert_eq!(
            settle_action(LifecycleAction::Restart, Ok(())).unwrap(),
            ActionOutcome::Applied
        );
    }

    #[test]
    fn test_connection_error_message() {
        let msg = format_connection_error(
            "/nonexistent/docker.sock",
            false,
            &ProviderError::Transport("refused".into()),
        );
        assert!(msg.contains("was not found"));

        let msg = format_connection_error(
            "/var/run/docker.sock",
            true,
            &ProviderError::Transport("refused".into()),
        );
        assert!(msg.contains("not responding"));
        assert!(msg.contains("refused"));
    }
}
