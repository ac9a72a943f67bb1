//! Docker runtime implementation using bollard

use crate::{
    settle_action, ActionOutcome, ContainerDetails, ContainerId, ContainerRuntime,
    ContainerState, ContainerSummary, ExecConfig, ExecResult, ExecStream, LifecycleAction,
    LogConfig, LogStream, MountInfo, PortMapping, ProviderError, Result, RuntimeInfo,
};
use async_trait::async_trait;
use bollard::container::{
    ListContainersOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::Docker;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Seconds bollard waits for a response before giving up
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Docker runtime using the bollard crate
pub struct DockerRuntime {
    client: Docker,
    endpoint: String,
}

impl DockerRuntime {
    /// Connect to the daemon at `socket_path` and verify it answers a ping
    pub async fn connect(socket_path: &str) -> Result<Self> {
        let runtime = Self::open(socket_path)?;
        runtime
            .client
            .ping()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("connected to docker at {}", socket_path);
        Ok(runtime)
    }

    /// Build a client for `socket_path` without contacting the daemon.
    /// Calls fail until the daemon comes up.
    pub fn open(socket_path: &str) -> Result<Self> {
        let client = if socket_path.starts_with("unix://") || socket_path.starts_with('/') {
            let path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else if socket_path.starts_with("http://")
            || socket_path.starts_with("https://")
            || socket_path.starts_with("tcp://")
        {
            let url = socket_path.replacen("tcp://", "http://", 1);
            Docker::connect_with_http(&url, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_socket(
                socket_path,
                CLIENT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        }
        .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: socket_path.to_string(),
        })
    }

    /// Get the underlying Docker client
    pub fn client(&self) -> &Docker {
        &self.client
    }

    fn exec_options(config: &ExecConfig) -> CreateExecOptions<String> {
        CreateExecOptions {
            cmd: Some(config.cmd.clone()),
            env: (!config.env.is_empty()).then(|| config.env.clone()),
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            tty: Some(config.tty),
            attach_stdin: Some(config.stdin),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self.client.list_containers(Some(options)).await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: ContainerId::new(c.id.unwrap_or_default()),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c
                    .state
                    .as_deref()
                    .map(ContainerState::from)
                    .unwrap_or(ContainerState::Unknown),
                status: c.status.unwrap_or_default(),
                ports: c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| PortMapping {
                        private_port: p.private_port,
                        public_port: p.public_port,
                        protocol: p
                            .typ
                            .map(|t| format!("{:?}", t).to_lowercase())
                            .filter(|t| t != "empty")
                            .unwrap_or_else(|| "tcp".to_string()),
                        ip: p.ip,
                    })
                    .collect(),
                created: c.created.unwrap_or(0),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let info = self.client.inspect_container(&id.0, None).await?;

        let state = info.state.as_ref();
        let status = state
            .and_then(|s| s.status)
            .map(|s| ContainerState::from(format!("{:?}", s).to_lowercase().as_str()))
            .unwrap_or(ContainerState::Unknown);
        let config = info.config.as_ref();

        let mounts = info
            .mounts
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                mount_type: m
                    .typ
                    .map(|t| format!("{:?}", t).to_lowercase())
                    .unwrap_or_else(|| "unknown".to_string()),
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                read_only: m.rw.map(|rw| !rw).unwrap_or(false),
            })
            .collect();

        let mut ports = Vec::new();
        if let Some(port_map) = info.network_settings.as_ref().and_then(|n| n.ports.as_ref()) {
            for (container_port, bindings) in port_map {
                let (port, protocol) = container_port
                    .split_once('/')
                    .unwrap_or((container_port.as_str(), "tcp"));
                let private_port: u16 = port.parse().unwrap_or(0);
                match bindings {
                    Some(bindings) if !bindings.is_empty() => {
                        for binding in bindings {
                            ports.push(PortMapping {
                                private_port,
                                public_port: binding.host_port.as_ref().and_then(|p| p.parse().ok()),
                                protocol: protocol.to_string(),
                                ip: binding.host_ip.clone(),
                            });
                        }
                    }
                    _ => ports.push(PortMapping {
                        private_port,
                        public_port: None,
                        protocol: protocol.to_string(),
                        ip: None,
                    }),
                }
            }
        }
        ports.sort_by_key(|p| (p.private_port, p.public_port));

        let parse_time = |s: Option<&String>| {
            s.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.timestamp())
        };

        Ok(ContainerDetails {
            id: id.clone(),
            name: info
                .name
                .clone()
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.and_then(|c| c.image.clone()).unwrap_or_default(),
            state: status,
            created: parse_time(info.created.as_ref()).unwrap_or(0),
            started_at: parse_time(state.and_then(|s| s.started_at.as_ref())),
            finished_at: parse_time(state.and_then(|s| s.finished_at.as_ref())),
            exit_code: state.and_then(|s| s.exit_code),
            restart_count: info.restart_count,
            labels: config.and_then(|c| c.labels.clone()).unwrap_or_default(),
            env: config.and_then(|c| c.env.clone()).unwrap_or_default(),
            mounts,
            ports,
            ip_address: info
                .network_settings
                .as_ref()
                .and_then(|n| n.ip_address.clone())
                .filter(|ip| !ip.is_empty()),
        })
    }

    async fn start(&self, id: &ContainerId) -> Result<ActionOutcome> {
        let result = self
            .client
            .start_container(&id.0, None::<StartContainerOptions<String>>)
            .await
            .map_err(ProviderError::from);
        settle_action(LifecycleAction::Start, result)
    }

    async fn stop(&self, id: &ContainerId, timeout: Option<u32>) -> Result<ActionOutcome> {
        let options = timeout.map(|t| StopContainerOptions { t: t as i64 });
        let result = self
            .client
            .stop_container(&id.0, options)
            .await
            .map_err(ProviderError::from);
        settle_action(LifecycleAction::Stop, result)
    }

    async fn restart(&self, id: &ContainerId, timeout: Option<u32>) -> Result<ActionOutcome> {
        let options = timeout.map(|t| RestartContainerOptions { t: t as isize });
        let result = self
            .client
            .restart_container(&id.0, options)
            .await
            .map_err(ProviderError::from);
        settle_action(LifecycleAction::Restart, result)
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<ActionOutcome> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        let result = self
            .client
            .remove_container(&id.0, Some(options))
            .await
            .map_err(ProviderError::from);
        settle_action(LifecycleAction::Remove, result)
    }

    async fn exec(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecResult> {
        let exec = self
            .client
            .create_exec(&id.0, Self::exec_options(config))
            .await?;

        let start_options = StartExecOptions {
            detach: false,
            tty: config.tty,
            ..Default::default()
        };
        let result = self.client.start_exec(&exec.id, Some(start_options)).await?;

        let mut output = String::new();
        if let StartExecResults::Attached { output: mut stream, .. } = result {
            while let Some(chunk) = stream.next().await {
                output.push_str(&String::from_utf8_lossy(payload(chunk?).as_ref()));
            }
        }

        let inspect = self.client.inspect_exec(&exec.id).await?;
        Ok(ExecResult {
            exit_code: inspect.exit_code.unwrap_or(-1),
            output,
        })
    }

    async fn exec_interactive(&self, id: &ContainerId, config: &ExecConfig) -> Result<ExecStream> {
        let exec = self
            .client
            .create_exec(&id.0, Self::exec_options(config))
            .await?;

        let start_options = StartExecOptions {
            detach: false,
            tty: config.tty,
            ..Default::default()
        };
        let result = self.client.start_exec(&exec.id, Some(start_options)).await?;

        match result {
            StartExecResults::Attached { output, input } => Ok(ExecStream {
                stdin: Some(input),
                output: Box::pin(OutputReader::new(output)),
                id: exec.id,
            }),
            StartExecResults::Detached => Err(ProviderError::Protocol {
                status: 200,
                message: "exec started detached".to_string(),
            }),
        }
    }

    async fn logs(&self, id: &ContainerId, config: &LogConfig) -> Result<LogStream> {
        let options = LogsOptions::<String> {
            follow: config.follow,
            stdout: config.stdout,
            stderr: config.stderr,
            tail: config.tail.clone(),
            timestamps: config.timestamps,
            ..Default::default()
        };

        // bollard strips the frame headers itself
        let stream = self.client.logs(&id.0, Some(options));
        Ok(LogStream::new(Box::pin(OutputReader::new(Box::pin(stream)))))
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    fn info(&self) -> RuntimeInfo {
        RuntimeInfo {
            endpoint: self.endpoint.clone(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

fn payload(output: LogOutput) -> impl AsRef<[u8]> {
    match output {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => message,
    }
}

/// Adapts a stream of bollard output frames into a byte reader
struct OutputReader<S> {
    stream: S,
    pending: Vec<u8>,
    pos: usize,
}

impl<S> OutputReader<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl<S> AsyncRead for OutputReader<S>
where
    S: Stream<Item = std::result::Result<LogOutput, bollard::errors::Error>> + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        loop {
            if self.pos < self.pending.len() {
                let remaining = &self.pending[self.pos..];
                let n = remaining.len().min(buf.remaining());
                buf.put_slice(&remaining[..n]);
                self.pos += n;
                return Poll::Ready(Ok(()));
            }

            match ready!(Pin::new(&mut self.stream).poll_next(cx)) {
                Some(Ok(output)) => {
                    let data = payload(output);
                    self.pending.clear();
                    self.pending.extend_from_slice(data.as_ref());
                    self.pos = 0;
                }
                Some(Err(e)) => {
                    return Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        e.to_string(),
                    )))
                }
                None => return Poll::Ready(Ok(())),
            }
        }
    }
}
