//! Opening interactive shells with a fallback list of candidates

use crate::{ContainerId, ContainerRuntime, ContainerState, ExecConfig, ExecStream, ProviderError, Result};

/// Shells tried when the caller has no preference
pub const DEFAULT_SHELLS: &[&str] = &["/bin/bash", "/bin/sh", "/busybox/sh"];

/// An attached interactive shell
#[derive(Debug)]
pub struct ExecSession {
    /// The candidate the runtime accepted
    pub shell: String,
    pub stream: ExecStream,
}

enum Probe {
    Accepted,
    Rejected,
}

/// Run `<shell> -c 'exit 0'` and report whether the shell exists.
async fn probe_shell(runtime: &dyn ContainerRuntime, id: &ContainerId, shell: &str) -> Result<Probe> {
    let config = ExecConfig::command([shell, "-c", "exit 0"]);
    match runtime.exec(id, &config).await {
        Ok(result) if result.exit_code == 0 => Ok(Probe::Accepted),
        Ok(result) => {
            tracing::debug!(
                "shell {} rejected in {} (exit {})",
                shell,
                id.short(),
                result.exit_code
            );
            Ok(Probe::Rejected)
        }
        Err(ProviderError::Protocol { status, message }) => {
            tracing::debug!("shell {} rejected in {}: {} {}", shell, id.short(), status, message);
            Ok(Probe::Rejected)
        }
        Err(e) => Err(e),
    }
}

fn classify_exec_error(id: &ContainerId, err: ProviderError) -> ProviderError {
    match err {
        ProviderError::ContainerNotRunning(_) | ProviderError::NotFound(_) => {
            ProviderError::ContainerNotRunning(id.short().to_string())
        }
        e if e.is_transport() => ProviderError::ConnectionFailed(e.to_string()),
        e => e,
    }
}

/// Attach an interactive TTY shell, trying each candidate in order.
///
/// Fails with [`ProviderError::ContainerNotRunning`] when the container is
/// stopped or gone, [`ProviderError::ConnectionFailed`] when the runtime
/// cannot be reached and [`ProviderError::NoShellAvailable`] when no
/// candidate runs.
pub async fn open_exec_session(
    runtime: &dyn ContainerRuntime,
    id: &ContainerId,
    candidates: &[String],
) -> Result<ExecSession> {
    for shell in candidates {
        match probe_shell(runtime, id, shell).await {
            Ok(Probe::Accepted) => {}
            Ok(Probe::Rejected) => continue,
            Err(e) => return Err(classify_exec_error(id, e)),
        }

        let config = ExecConfig::interactive_shell(shell);
        match runtime.exec_interactive(id, &config).await {
            Ok(stream) => {
                tracing::info!("attached {} in {}", shell, id.short());
                return Ok(ExecSession {
                    shell: shell.clone(),
                    stream,
                });
            }
            Err(ProviderError::Protocol { status, message }) => {
                tracing::debug!("attach with {} failed: {} {}", shell, status, message);
            }
            Err(e) => return Err(classify_exec_error(id, e)),
        }
    }

    Err(ProviderError::NoShellAvailable(id.short().to_string()))
}

/// Best-effort check that a shell can be opened in the container.
///
/// Negative answers (stopped container, missing container, no shell) are
/// `Ok(false)`; only transport failures are errors.
pub async fn check_exec_capability(
    runtime: &dyn ContainerRuntime,
    id: &ContainerId,
    candidates: &[String],
) -> Result<bool> {
    match runtime.inspect(id).await {
        Ok(details) if details.state != ContainerState::Running => return Ok(false),
        Ok(_) => {}
        Err(e) if e.is_transport() => return Err(ProviderError::ConnectionFailed(e.to_string())),
        Err(_) => return Ok(false),
    }

    for shell in candidates {
        match probe_shell(runtime, id, shell).await {
            Ok(Probe::Accepted) => return Ok(true),
            Ok(Probe::Rejected) => {}
            Err(e) if e.is_transport() => {
                return Err(ProviderError::ConnectionFailed(e.to_string()))
            }
            Err(_) => return Ok(false),
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ActionOutcome, ContainerDetails, ContainerSummary, ExecResult, LogConfig, LogStream,
        RuntimeInfo,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Runtime answering exec probes from a table of shell -> exit code
    struct ShellTable {
        running: bool,
        shells: HashMap<String, i64>,
        transport_down: bool,
        probed: Mutex<Vec<String>>,
    }

    impl ShellTable {
        fn new(shells: &[(&str, i64)]) -> Self {
            Self {
                running: true,
                shells: shells.iter().map(|(s, c)| (s.to_string(), *c)).collect(),
                transport_down: false,
                probed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for ShellTable {
        async fn list(&self, _all: bool) -> Result<Vec<ContainerSummary>> {
            Ok(vec![])
        }
        async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails> {
            if self.transport_down {
                return Err(ProviderError::Transport("socket closed".into()));
            }
            Ok(ContainerDetails {
                id: id.clone(),
                name: "box".into(),
                image: "alpine".into(),
                state: if self.running {
                    ContainerState::Running
                } else {
                    ContainerState::Exited
                },
                created: 0,
                started_at: None,
                finished_at: None,
                exit_code: None,
                restart_count: None,
                labels: HashMap::new(),
                env: vec![],
                mounts: vec![],
                ports: vec![],
                ip_address: None,
            })
        }
        async fn start(&self, _id: &ContainerId) -> Result<ActionOutcome> {
            Ok(ActionOutcome::Applied)
        }
        async fn stop(&self, _id: &ContainerId, _t: Option<u32>) -> Result<ActionOutcome> {
            Ok(ActionOutcome::Applied)
        }
        async fn restart(&self, _id: &ContainerId, _t: Option<u32>) -> Result<ActionOutcome> {
            Ok(ActionOutcome::Applied)
        }
        async fn remove(&self, _id: &ContainerId, _f: bool) -> Result<ActionOutcome> {
            Ok(ActionOutcome::Applied)
        }
        async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecResult> {
            if self.transport_down {
                return Err(ProviderError::Transport("socket closed".into()));
            }
            if !self.running {
                return Err(ProviderError::ContainerNotRunning(id.0.clone()));
            }
            let shell = config.cmd[0].clone();
            self.probed.lock().unwrap().push(shell.clone());
            let exit_code = self.shells.get(&shell).copied().unwrap_or(127);
            Ok(ExecResult {
                exit_code,
                output: String::new(),
            })
        }
        async fn exec_interactive(&self, _id: &ContainerId, config: &ExecConfig) -> Result<ExecStream> {
            assert!(config.tty && config.stdin);
            let (near, _far) = tokio::io::duplex(64);
            let (read, write) = tokio::io::split(near);
            Ok(ExecStream {
                stdin: Some(Box::pin(write)),
                output: Box::pin(read),
                id: "exec-1".into(),
            })
        }
        async fn logs(&self, _id: &ContainerId, _c: &LogConfig) -> Result<LogStream> {
            Ok(LogStream::new(Box::pin(std::io::Cursor::new(Vec::new()))))
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn info(&self) -> RuntimeInfo {
            RuntimeInfo {
                endpoint: "table".into(),
                api_version: "1.44".into(),
                os: "linux".into(),
                arch: "x86_64".into(),
            }
        }
    }

    fn candidates() -> Vec<String> {
        DEFAULT_SHELLS.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_falls_back_to_second_shell() {
        let runtime = ShellTable::new(&[("/bin/bash", 126), ("/bin/sh", 0)]);
        let id = ContainerId::new("abc");

        let session = open_exec_session(&runtime, &id, &candidates()).await.unwrap();
        assert_eq!(session.shell, "/bin/sh");
        assert_eq!(*runtime.probed.lock().unwrap(), vec!["/bin/bash", "/bin/sh"]);
    }

    #[tokio::test]
    async fn test_no_shell_available() {
        let runtime = ShellTable::new(&[]);
        let err = open_exec_session(&runtime, &ContainerId::new("abc"), &candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoShellAvailable(_)));
        assert_eq!(runtime.probed.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_not_running_is_distinct() {
        let mut runtime = ShellTable::new(&[("/bin/bash", 0)]);
        runtime.running = false;
        let err = open_exec_session(&runtime, &ContainerId::new("abc"), &candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ContainerNotRunning(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_connection_failed() {
        let mut runtime = ShellTable::new(&[("/bin/bash", 0)]);
        runtime.transport_down = true;
        let err = open_exec_session(&runtime, &ContainerId::new("abc"), &candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_capability_check() {
        let id = ContainerId::new("abc");

        let runtime = ShellTable::new(&[("/busybox/sh", 0)]);
        assert!(check_exec_capability(&runtime, &id, &candidates()).await.unwrap());

        let runtime = ShellTable::new(&[]);
        assert!(!check_exec_capability(&runtime, &id, &candidates()).await.unwrap());

        let mut runtime = ShellTable::new(&[("/bin/bash", 0)]);
        runtime.running = false;
        assert!(!check_exec_capability(&runtime, &id, &candidates()).await.unwrap());

        let mut runtime = ShellTable::new(&[("/bin/bash", 0)]);
        runtime.transport_down = true;
        assert!(check_exec_capability(&runtime, &id, &candidates()).await.is_err());
    }
}
