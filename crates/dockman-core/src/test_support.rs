//! Test support utilities for dockman-core
//!
//! Provides MockRuntime and helpers for exercising the reconciler, the
//! controller and live sessions without a Docker daemon.

use async_trait::async_trait;
use dockman_provider::demux::StreamKind;
use dockman_provider::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Records which methods were called on the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List { all: bool },
    Inspect { id: String },
    Start { id: String },
    Stop { id: String, timeout: Option<u32> },
    Restart { id: String },
    Remove { id: String, force: bool },
    Exec { id: String, cmd: Vec<String> },
    ExecInteractive { id: String, shell: String },
    Logs { id: String, tail: String },
    Ping,
}

/// Configurable mock container runtime for testing.
///
/// Containers live in `containers`; whether each one runs is tracked in
/// `running`, so lifecycle calls change what the next `list` returns.
pub struct MockRuntime {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    pub containers: Arc<Mutex<Vec<ContainerSummary>>>,
    /// Full ids of running containers
    pub running: Arc<Mutex<HashSet<String>>>,
    /// Scripted list answers, consumed before falling back to `containers`
    pub list_results: Arc<Mutex<VecDeque<Result<Vec<ContainerSummary>>>>>,
    /// Delay applied to every list call
    pub list_delay: Arc<Mutex<Option<Duration>>>,
    /// Make the next list call panic
    pub list_panic: Arc<Mutex<bool>>,
    /// Exit code of `<shell> -c 'exit 0'` per shell path; absent shells exit 127
    pub shells: Arc<Mutex<HashMap<String, i64>>>,
    /// Error for exec and exec_interactive calls
    pub exec_error: Arc<Mutex<Option<ProviderError>>>,
    /// Error for start, stop, restart and remove calls
    pub action_error: Arc<Mutex<Option<ProviderError>>>,
    /// Delay applied to start, stop, restart and remove calls
    pub action_delay: Arc<Mutex<Option<Duration>>>,
    /// Container side of every interactive exec session, in open order
    pub shell_ends: Arc<Mutex<Vec<Option<DuplexStream>>>>,
    /// Raw (multiplexed) log bytes per full container id
    pub log_data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Keep log streams open after the scripted bytes
    pub log_follow: Arc<Mutex<bool>>,
    /// Writer side of followed log streams, in open order
    pub log_ends: Arc<Mutex<Vec<Option<DuplexStream>>>>,
    pub log_error: Arc<Mutex<Option<ProviderError>>>,
    exec_counter: Arc<Mutex<u64>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Empty runtime where `/bin/sh` is the only working shell
    pub fn new() -> Self {
        let mut shells = HashMap::new();
        shells.insert("/bin/sh".to_string(), 0);
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            containers: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(Mutex::new(HashSet::new())),
            list_results: Arc::new(Mutex::new(VecDeque::new())),
            list_delay: Arc::new(Mutex::new(None)),
            list_panic: Arc::new(Mutex::new(false)),
            shells: Arc::new(Mutex::new(shells)),
            exec_error: Arc::new(Mutex::new(None)),
            action_error: Arc::new(Mutex::new(None)),
            action_delay: Arc::new(Mutex::new(None)),
            shell_ends: Arc::new(Mutex::new(Vec::new())),
            log_data: Arc::new(Mutex::new(HashMap::new())),
            log_follow: Arc::new(Mutex::new(false)),
            log_ends: Arc::new(Mutex::new(Vec::new())),
            log_error: Arc::new(Mutex::new(None)),
            exec_counter: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a container; status text starting with "Up" marks it running
    pub fn with_container(self, summary: ContainerSummary) -> Self {
        self.add_container(summary);
        self
    }

    pub fn add_container(&self, summary: ContainerSummary) {
        if summary.status.starts_with("Up") {
            self.running.lock().unwrap().insert(summary.id.0.clone());
        }
        self.containers.lock().unwrap().push(summary);
    }

    pub fn push_list_result(&self, result: Result<Vec<ContainerSummary>>) {
        self.list_results.lock().unwrap().push_back(result);
    }

    pub fn set_logs(&self, id: &str, raw: Vec<u8>) {
        self.log_data.lock().unwrap().insert(id.to_string(), raw);
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.running.lock().unwrap().contains(id)
    }

    /// Take the container side of the n-th interactive session
    pub fn take_shell_end(&self, index: usize) -> Option<DuplexStream> {
        self.shell_ends.lock().unwrap().get_mut(index).and_then(Option::take)
    }

    pub fn shell_sessions_opened(&self) -> usize {
        self.shell_ends.lock().unwrap().len()
    }

    /// Take the writer side of the n-th followed log stream
    pub fn take_log_end(&self, index: usize) -> Option<DuplexStream> {
        self.log_ends.lock().unwrap().get_mut(index).and_then(Option::take)
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Check if a specific call was made
    pub fn was_called(&self, call: &MockCall) -> bool {
        self.calls.lock().unwrap().contains(call)
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn known(&self, id: &ContainerId) -> bool {
        self.containers.lock().unwrap().iter().any(|c| c.id == *id)
    }

    fn scripted_error(slot: &Arc<Mutex<Option<ProviderError>>>) -> Option<ProviderError> {
        slot.lock().unwrap().as_ref().map(clone_provider_error)
    }

    async fn action_pause(&self) {
        let delay = *self.action_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn current_listing(&self, all: bool) -> Vec<ContainerSummary> {
        let running = self.running.lock().unwrap();
        self.containers
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut c| {
                let up = running.contains(&c.id.0);
                if up && !c.status.starts_with("Up") {
                    c.status = "Up 1 second".to_string();
                    c.state = ContainerState::Running;
                } else if !up && c.status.starts_with("Up") {
                    c.status = "Exited (0) 1 second ago".to_string();
                    c.state = ContainerState::Exited;
                }
                c
            })
            .filter(|c| all || c.state == ContainerState::Running)
            .collect()
    }
}

/// Clone a ProviderError (thiserror types don't implement Clone)
pub fn clone_provider_error(e: &ProviderError) -> ProviderError {
    match e {
        ProviderError::Transport(s) => ProviderError::Transport(s.clone()),
        ProviderError::Protocol { status, message } => ProviderError::Protocol {
            status: *status,
            message: message.clone(),
        },
        ProviderError::NotFound(s) => ProviderError::NotFound(s.clone()),
        ProviderError::NoShellAvailable(s) => ProviderError::NoShellAvailable(s.clone()),
        ProviderError::ContainerNotRunning(s) => ProviderError::ContainerNotRunning(s.clone()),
        ProviderError::ConnectionFailed(s) => ProviderError::ConnectionFailed(s.clone()),
        ProviderError::Timeout => ProviderError::Timeout,
        ProviderError::Io(e) => ProviderError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

/// Create a container summary. Status text starting with "Up" means running.
pub fn mock_summary(
    id: &str,
    name: &str,
    image: &str,
    status: &str,
    project: Option<&str>,
) -> ContainerSummary {
    let mut labels = HashMap::new();
    if let Some(project) = project {
        labels.insert(COMPOSE_PROJECT_LABEL.to_string(), project.to_string());
    }
    let state = if status.starts_with("Up") {
        ContainerState::Running
    } else if status.starts_with("Exited") {
        ContainerState::Exited
    } else {
        ContainerState::Created
    };
    ContainerSummary {
        id: ContainerId::new(id),
        names: vec![format!("/{}", name)],
        image: image.to_string(),
        state,
        status: status.to_string(),
        ports: Vec::new(),
        created: 1_700_000_000,
        labels,
    }
}

/// Wrap a payload in a log frame header
pub fn frame(kind: StreamKind, payload: &[u8]) -> Vec<u8> {
    let stream = match kind {
        StreamKind::Stdin => 0u8,
        StreamKind::Stdout => 1,
        StreamKind::Stderr => 2,
    };
    let mut out = vec![stream, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Frame each line as stdout output
pub fn framed_lines(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .flat_map(|l| frame(StreamKind::Stdout, format!("{}\n", l).as_bytes()))
        .collect()
}

fn not_found(id: &ContainerId) -> ProviderError {
    ProviderError::NotFound(format!("No such container: {}", id))
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        self.record(MockCall::List { all });
        if std::mem::take(&mut *self.list_panic.lock().unwrap()) {
            panic!("mock list panicked");
        }
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.list_results.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(self.current_listing(all)),
        }
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails> {
        self.record(MockCall::Inspect { id: id.0.clone() });
        let summary = self
            .containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))?;
        let state = if self.is_running(&id.0) {
            ContainerState::Running
        } else {
            ContainerState::Exited
        };
        Ok(ContainerDetails {
            id: summary.id.clone(),
            name: summary.display_name(),
            image: summary.image.clone(),
            state,
            created: summary.created,
            started_at: None,
            finished_at: None,
            exit_code: None,
            restart_count: Some(0),
            labels: summary.labels.clone(),
            env: Vec::new(),
            mounts: Vec::new(),
            ports: summary.ports.clone(),
            ip_address: None,
        })
    }

    async fn start(&self, id: &ContainerId) -> Result<ActionOutcome> {
        self.record(MockCall::Start { id: id.0.clone() });
        self.action_pause().await;
        if let Some(e) = Self::scripted_error(&self.action_error) {
            return Err(e);
        }
        let result = if !self.known(id) {
            Err(not_found(id))
        } else if !self.running.lock().unwrap().insert(id.0.clone()) {
            Err(ProviderError::Protocol {
                status: 304,
                message: "container already started".to_string(),
            })
        } else {
            Ok(())
        };
        settle_action(LifecycleAction::Start, result)
    }

    async fn stop(&self, id: &ContainerId, timeout: Option<u32>) -> Result<ActionOutcome> {
        self.record(MockCall::Stop {
            id: id.0.clone(),
            timeout,
        });
        self.action_pause().await;
        if let Some(e) = Self::scripted_error(&self.action_error) {
            return Err(e);
        }
        let result = if !self.known(id) {
            Err(not_found(id))
        } else if !self.running.lock().unwrap().remove(&id.0) {
            Err(ProviderError::Protocol {
                status: 304,
                message: "container already stopped".to_string(),
            })
        } else {
            Ok(())
        };
        settle_action(LifecycleAction::Stop, result)
    }

    async fn restart(&self, id: &ContainerId, _timeout: Option<u32>) -> Result<ActionOutcome> {
        self.record(MockCall::Restart { id: id.0.clone() });
        self.action_pause().await;
        if let Some(e) = Self::scripted_error(&self.action_error) {
            return Err(e);
        }
        if !self.known(id) {
            return Err(not_found(id));
        }
        self.running.lock().unwrap().insert(id.0.clone());
        Ok(ActionOutcome::Applied)
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<ActionOutcome> {
        self.record(MockCall::Remove {
            id: id.0.clone(),
            force,
        });
        self.action_pause().await;
        if let Some(e) = Self::scripted_error(&self.action_error) {
            return Err(e);
        }
        let result = if !self.known(id) {
            Err(not_found(id))
        } else if self.is_running(&id.0) && !force {
            Err(ProviderError::Protocol {
                status: 409,
                message: "cannot remove a running container".to_string(),
            })
        } else {
            self.running.lock().unwrap().remove(&id.0);
            self.containers.lock().unwrap().retain(|c| c.id != *id);
            Ok(())
        };
        settle_action(LifecycleAction::Remove, result)
    }

    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecResult> {
        self.record(MockCall::Exec {
            id: id.0.clone(),
            cmd: config.cmd.clone(),
        });
        if let Some(e) = Self::scripted_error(&self.exec_error) {
            return Err(e);
        }
        if !self.known(id) {
            return Err(not_found(id));
        }
        if !self.is_running(&id.0) {
            return Err(ProviderError::ContainerNotRunning(id.0.clone()));
        }
        let shell = config.cmd.first().cloned().unwrap_or_default();
        let exit_code = self.shells.lock().unwrap().get(&shell).copied().unwrap_or(127);
        let output = if exit_code == 127 {
            format!("exec: {}: not found", shell)
        } else {
            String::new()
        };
        Ok(ExecResult { exit_code, output })
    }

    async fn exec_interactive(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecStream> {
        let shell = config.cmd.first().cloned().unwrap_or_default();
        self.record(MockCall::ExecInteractive {
            id: id.0.clone(),
            shell: shell.clone(),
        });
        if let Some(e) = Self::scripted_error(&self.exec_error) {
            return Err(e);
        }
        if !self.is_running(&id.0) {
            return Err(ProviderError::ContainerNotRunning(id.0.clone()));
        }
        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        let (output, input) = tokio::io::split(near);
        self.shell_ends.lock().unwrap().push(Some(far));
        let exec_id = {
            let mut counter = self.exec_counter.lock().unwrap();
            *counter += 1;
            format!("exec-{}", *counter)
        };
        Ok(ExecStream {
            stdin: Some(Box::pin(input)),
            output: Box::pin(output),
            id: exec_id,
        })
    }

    async fn logs(&self, id: &ContainerId, config: &LogConfig) -> Result<LogStream> {
        self.record(MockCall::Logs {
            id: id.0.clone(),
            tail: config.tail.clone(),
        });
        if let Some(e) = Self::scripted_error(&self.log_error) {
            return Err(e);
        }
        if !self.known(id) {
            return Err(not_found(id));
        }
        let data = self.log_data.lock().unwrap().get(&id.0).cloned().unwrap_or_default();
        let (reader, mut writer) = tokio::io::duplex(PIPE_CAPACITY.max(data.len() + 1));
        writer.write_all(&data).await?;
        let follow = *self.log_follow.lock().unwrap();
        if follow {
            self.log_ends.lock().unwrap().push(Some(writer));
        }
        Ok(LogStream::multiplexed(reader))
    }

    async fn ping(&self) -> Result<()> {
        self.record(MockCall::Ping);
        Ok(())
    }

    fn info(&self) -> RuntimeInfo {
        RuntimeInfo {
            endpoint: "mock://".to_string(),
            api_version: "1.43".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        }
    }
}

/// Build an `Arc` runtime and keep a handle for assertions
pub fn shared(mock: MockRuntime) -> (Arc<MockRuntime>, Arc<dyn ContainerRuntime>) {
    let mock = Arc::new(mock);
    let runtime: Arc<dyn ContainerRuntime> = mock.clone();
    (mock, runtime)
}
