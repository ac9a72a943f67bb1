//! Live log and shell sessions
//!
//! [`SessionManager`] owns every open session and the background pump that
//! feeds it. Pumps never touch session state: they send [`SessionEvent`]s
//! that the event loop hands back to [`SessionManager::apply`], so each
//! buffer has a single writer. Every pump carries the epoch it was started
//! with; events from a superseded pump are dropped on arrival. Background
//! shell connects run under the same rule and report as
//! [`SessionEvent::ShellConnected`].

mod buffer;
mod input;
mod logs;
mod scroll;
mod shell;
pub mod terminal;

pub use buffer::*;
pub use input::*;
pub use logs::*;
pub use scroll::*;
pub use shell::*;

use crate::{bounded, CoreError, Result};
use dockman_config::GlobalConfig;
use dockman_provider::{
    check_exec_capability, open_exec_session, ContainerId, ContainerRuntime, ExecSession,
    LogConfig, ProviderError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 4096;

/// Tunables for sessions, usually taken from the global config
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub buffer_lines: usize,
    pub filter_window: usize,
    pub log_tail: String,
    pub log_timestamps: bool,
    pub shell_candidates: Vec<String>,
    pub call_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&GlobalConfig::default())
    }
}

impl From<&GlobalConfig> for SessionSettings {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            buffer_lines: config.sessions.buffer_lines,
            filter_window: config.sessions.filter_window,
            log_tail: config.sessions.log_tail.clone(),
            log_timestamps: config.sessions.log_timestamps,
            shell_candidates: config.sessions.shell_candidates.clone(),
            call_timeout: config.call_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Logs,
    Shell,
}

/// At most one session exists per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub container_id: ContainerId,
    pub kind: SessionKind,
}

impl SessionKey {
    pub fn logs(container_id: ContainerId) -> Self {
        Self {
            container_id,
            kind: SessionKind::Logs,
        }
    }

    pub fn shell(container_id: ContainerId) -> Self {
        Self {
            container_id,
            kind: SessionKind::Shell,
        }
    }
}

/// Messages from pumps to the event loop
#[derive(Debug)]
pub enum SessionEvent {
    LogLines {
        key: SessionKey,
        epoch: u64,
        lines: Vec<String>,
    },
    LogEnded {
        key: SessionKey,
        epoch: u64,
        error: Option<String>,
    },
    ShellOutput {
        key: SessionKey,
        epoch: u64,
        bytes: Vec<u8>,
    },
    ShellClosed {
        key: SessionKey,
        epoch: u64,
        error: Option<String>,
    },
    /// A background connect finished
    ShellConnected {
        key: SessionKey,
        epoch: u64,
        result: ConnectResult,
    },
}

/// Why a shell connect did not attach
#[derive(Debug)]
pub enum ConnectFailure {
    /// No shell can run in the container; input stays disabled
    Unavailable(String),
    /// The runtime call failed; the next submit tries again
    Failed(ProviderError),
}

pub type ConnectResult = std::result::Result<ExecSession, ConnectFailure>;

impl SessionEvent {
    pub fn key(&self) -> &SessionKey {
        match self {
            Self::LogLines { key, .. }
            | Self::LogEnded { key, .. }
            | Self::ShellOutput { key, .. }
            | Self::ShellClosed { key, .. }
            | Self::ShellConnected { key, .. } => key,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Self::LogLines { epoch, .. }
            | Self::LogEnded { epoch, .. }
            | Self::ShellOutput { epoch, .. }
            | Self::ShellClosed { epoch, .. }
            | Self::ShellConnected { epoch, .. } => *epoch,
        }
    }
}

#[derive(Debug)]
pub enum Session {
    Logs(LogSession),
    Shell(ShellSession),
}

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// The input handle was closed; a new exec session was opened first
    Reconnected,
    /// `exit` closed the session locally
    Closed,
    /// The shell was not connected; the command is sent once a background
    /// connect attaches
    Queued,
    /// Nothing to send
    Ignored,
}

/// Stop signal plus task handle of a running pump
struct Pump {
    epoch: u64,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Pump {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

/// A command waiting for its shell to reconnect
#[derive(Debug, Clone)]
struct QueuedInput {
    command: String,
    /// Already recorded in history by a failed first write
    retry: bool,
}

/// Owner of all live sessions
pub struct SessionManager {
    runtime: Arc<dyn ContainerRuntime>,
    settings: SessionSettings,
    sessions: HashMap<SessionKey, Session>,
    pumps: HashMap<SessionKey, Pump>,
    queued: HashMap<SessionKey, QueuedInput>,
    tx: mpsc::UnboundedSender<SessionEvent>,
    next_epoch: u64,
}

impl SessionManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        settings: SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            runtime,
            settings,
            sessions: HashMap::new(),
            pumps: HashMap::new(),
            queued: HashMap::new(),
            tx,
            next_epoch: 0,
        };
        (manager, rx)
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn bump_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    /// Open a view, reusing a live session for the same container and kind.
    ///
    /// A log session whose pump has stopped is superseded by a fresh pump.
    /// A shell session starts `Disconnected`; call [`Self::connect`] or
    /// [`Self::ensure_connected`].
    pub fn open(&mut self, container_id: &ContainerId, name: &str, kind: SessionKind) -> SessionKey {
        let key = SessionKey {
            container_id: container_id.clone(),
            kind,
        };
        match kind {
            SessionKind::Logs => {
                let alive = self.pumps.get(&key).map(Pump::is_running).unwrap_or(false);
                if alive && self.sessions.contains_key(&key) {
                    tracing::debug!("reusing log session for {}", container_id.short());
                    return key;
                }
                let session = self.sessions.entry(key.clone()).or_insert_with(|| {
                    Session::Logs(LogSession::new(
                        container_id.clone(),
                        name,
                        self.settings.buffer_lines,
                        self.settings.filter_window,
                    ))
                });
                if let Session::Logs(logs) = session {
                    logs.restart();
                }
                self.start_log_pump(&key);
            }
            SessionKind::Shell => {
                self.sessions.entry(key.clone()).or_insert_with(|| {
                    Session::Shell(ShellSession::new(
                        container_id.clone(),
                        name,
                        self.settings.buffer_lines,
                    ))
                });
            }
        }
        key
    }

    /// Stop the pump, close the handles and drop the buffer
    pub fn close(&mut self, key: &SessionKey) {
        self.pumps.remove(key);
        self.queued.remove(key);
        if self.sessions.remove(key).is_some() {
            tracing::debug!("closed {:?} session for {}", key.kind, key.container_id.short());
        }
    }

    /// Close every session of a container
    pub fn close_container(&mut self, container_id: &ContainerId) {
        for kind in [SessionKind::Logs, SessionKind::Shell] {
            self.close(&SessionKey {
                container_id: container_id.clone(),
                kind,
            });
        }
    }

    pub fn close_all(&mut self) {
        self.pumps.clear();
        self.queued.clear();
        self.sessions.clear();
    }

    pub fn is_open(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn has_running_pump(&self, key: &SessionKey) -> bool {
        self.pumps.get(key).map(Pump::is_running).unwrap_or(false)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn log_session(&self, key: &SessionKey) -> Option<&LogSession> {
        match self.sessions.get(key) {
            Some(Session::Logs(s)) => Some(s),
            _ => None,
        }
    }

    pub fn log_session_mut(&mut self, key: &SessionKey) -> Option<&mut LogSession> {
        match self.sessions.get_mut(key) {
            Some(Session::Logs(s)) => Some(s),
            _ => None,
        }
    }

    pub fn shell_session(&self, key: &SessionKey) -> Option<&ShellSession> {
        match self.sessions.get(key) {
            Some(Session::Shell(s)) => Some(s),
            _ => None,
        }
    }

    pub fn shell_session_mut(&mut self, key: &SessionKey) -> Option<&mut ShellSession> {
        match self.sessions.get_mut(key) {
            Some(Session::Shell(s)) => Some(s),
            _ => None,
        }
    }

    /// Current display lines of a session
    pub fn buffer_snapshot(&self, key: &SessionKey) -> Vec<String> {
        match self.sessions.get(key) {
            Some(Session::Logs(s)) => s.snapshot(),
            Some(Session::Shell(s)) => s.render_lines(),
            None => Vec::new(),
        }
    }

    /// Route a pump message to its session. Returns true if anything changed.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let current = self.pumps.get(event.key()).map(|p| p.epoch);
        if current != Some(event.epoch()) {
            tracing::trace!("dropping stale session event for {:?}", event.key());
            return false;
        }

        match event {
            SessionEvent::LogLines { key, lines, .. } => match self.log_session_mut(&key) {
                Some(logs) => {
                    logs.push_lines(lines);
                    true
                }
                None => false,
            },
            SessionEvent::LogEnded { key, error, .. } => {
                let changed = match self.log_session_mut(&key) {
                    Some(logs) => {
                        logs.mark_ended(error);
                        true
                    }
                    None => false,
                };
                self.pumps.remove(&key);
                changed
            }
            SessionEvent::ShellOutput { key, bytes, .. } => match self.shell_session_mut(&key) {
                Some(shell) => {
                    shell.apply_output(&bytes);
                    true
                }
                None => false,
            },
            SessionEvent::ShellClosed { key, error, .. } => {
                let changed = match self.shell_session_mut(&key) {
                    Some(shell) => {
                        shell.mark_disconnected(error);
                        true
                    }
                    None => false,
                };
                self.pumps.remove(&key);
                changed
            }
            SessionEvent::ShellConnected { key, epoch, result } => {
                self.pumps.remove(&key);
                if let Err(e) = self.finish_connect(&key, epoch, result) {
                    tracing::debug!("shell for {} not connected: {}", key.container_id.short(), e);
                }
                true
            }
        }
    }

    fn start_log_pump(&mut self, key: &SessionKey) {
        let epoch = self.bump_epoch();
        let (stop_tx, stop_rx) = watch::channel(false);
        let config = LogConfig {
            follow: true,
            stdout: true,
            stderr: true,
            tail: self.settings.log_tail.clone(),
            timestamps: self.settings.log_timestamps,
        };
        let task = tokio::spawn(log_pump(
            self.runtime.clone(),
            key.clone(),
            epoch,
            config,
            self.settings.call_timeout,
            self.tx.clone(),
            stop_rx,
        ));
        // replacing the entry drops and stops any previous pump
        self.pumps.insert(
            key.clone(),
            Pump {
                epoch,
                stop: stop_tx,
                task,
            },
        );
    }

    fn start_shell_pump(&mut self, key: &SessionKey, epoch: u64, output: std::pin::Pin<Box<dyn AsyncRead + Send>>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(shell_pump(key.clone(), epoch, output, self.tx.clone(), stop_rx));
        self.pumps.insert(
            key.clone(),
            Pump {
                epoch,
                stop: stop_tx,
                task,
            },
        );
    }

    /// Mark the shell as connecting unless it already is connected. Returns
    /// false when there is nothing to do.
    fn prepare_connect(&mut self, key: &SessionKey) -> Result<bool> {
        let shell = self
            .shell_session_mut(key)
            .ok_or_else(|| CoreError::SessionNotFound(key.container_id.short().to_string()))?;
        if shell.is_connected() {
            return Ok(false);
        }
        if let ShellState::Unavailable(reason) = shell.state() {
            return Err(CoreError::ShellUnavailable(reason.clone()));
        }
        shell.begin_connect();
        // a stale pump must not keep feeding the session
        self.pumps.remove(key);
        Ok(true)
    }

    /// Attach the result of a connect attempt to the session
    fn finish_connect(&mut self, key: &SessionKey, epoch: u64, result: ConnectResult) -> Result<()> {
        let failure = match result {
            Ok(exec) => {
                let Some(writer) = exec.stream.stdin else {
                    let reason = "exec session has no input stream".to_string();
                    if let Some(shell) = self.shell_session_mut(key) {
                        shell.connect_failed(reason.clone());
                    }
                    self.queued.remove(key);
                    return Err(CoreError::InvalidState(reason));
                };
                let Some(shell) = self.shell_session_mut(key) else {
                    return Err(CoreError::SessionNotFound(key.container_id.short().to_string()));
                };
                shell.attach(epoch, exec.shell, writer);
                self.start_shell_pump(key, epoch, exec.stream.output);
                return Ok(());
            }
            Err(failure) => failure,
        };

        self.queued.remove(key);
        match failure {
            ConnectFailure::Unavailable(reason) => {
                if let Some(shell) = self.shell_session_mut(key) {
                    shell.mark_unavailable(reason.clone());
                }
                Err(CoreError::ShellUnavailable(reason))
            }
            ConnectFailure::Failed(e) => {
                if let Some(shell) = self.shell_session_mut(key) {
                    shell.connect_failed(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Make sure the shell session has a live exec session. Idempotent when
    /// already connected; otherwise probes the container, opens a new exec
    /// session and starts its output pump.
    pub async fn ensure_connected(&mut self, key: &SessionKey) -> Result<()> {
        if !self.prepare_connect(key)? {
            return Ok(());
        }
        let result = connect_shell(
            self.runtime.clone(),
            key.container_id.clone(),
            self.settings.shell_candidates.clone(),
            self.settings.call_timeout,
        )
        .await;
        let epoch = self.bump_epoch();
        self.finish_connect(key, epoch, result)
    }

    /// Start connecting the shell in the background. The outcome arrives as
    /// [`SessionEvent::ShellConnected`] and takes effect in [`Self::apply`].
    /// Returns false when the shell is already connected or connecting.
    pub fn connect(&mut self, key: &SessionKey) -> Result<bool> {
        let connecting = self
            .shell_session(key)
            .map(|s| s.state() == &ShellState::Connecting)
            .unwrap_or(false);
        if connecting && self.has_running_pump(key) {
            return Ok(false);
        }
        if !self.prepare_connect(key)? {
            return Ok(false);
        }

        let epoch = self.bump_epoch();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let runtime = self.runtime.clone();
        let candidates = self.settings.shell_candidates.clone();
        let limit = self.settings.call_timeout;
        let tx = self.tx.clone();
        let event_key = key.clone();
        let task = tokio::spawn(async move {
            let container_id = event_key.container_id.clone();
            tokio::select! {
                _ = stop_rx.changed() => {}
                result = connect_shell(runtime, container_id, candidates, limit) => {
                    let _ = tx.send(SessionEvent::ShellConnected { key: event_key, epoch, result });
                }
            }
        });
        tracing::debug!("connecting shell for {}", key.container_id.short());
        self.pumps.insert(
            key.clone(),
            Pump {
                epoch,
                stop: stop_tx,
                task,
            },
        );
        Ok(true)
    }

    /// Send a command line to a shell session.
    ///
    /// Empty input is ignored. `exit` closes the session without sending.
    /// A closed input handle is reopened before sending, and a failed write
    /// is retried once on a fresh session.
    pub async fn submit_input(&mut self, key: &SessionKey, text: &str) -> Result<SubmitOutcome> {
        let command = text.trim().to_string();
        let limit = self.settings.call_timeout;
        {
            let shell = self
                .shell_session_mut(key)
                .ok_or_else(|| CoreError::SessionNotFound(key.container_id.short().to_string()))?;
            if let ShellState::Unavailable(reason) = shell.state() {
                return Err(CoreError::ShellUnavailable(reason.clone()));
            }
            if command.is_empty() {
                return Ok(SubmitOutcome::Ignored);
            }
            if command == "exit" {
                shell.record_submit(&command);
                shell.close_for_exit();
                self.pumps.remove(key);
                return Ok(SubmitOutcome::Closed);
            }
        }

        let mut reconnected = false;
        if !self.shell_session(key).map(ShellSession::is_connected).unwrap_or(false) {
            if let Some(shell) = self.shell_session_mut(key) {
                shell.push_banner("Reconnecting...");
            }
            self.ensure_connected(key).await?;
            reconnected = true;
        }

        let first = match self.shell_session_mut(key) {
            Some(shell) => {
                shell.record_submit(&command);
                shell.write_line(&command, limit).await
            }
            None => return Err(CoreError::SessionNotFound(key.container_id.short().to_string())),
        };

        if let Err(e) = first {
            tracing::info!("shell write failed ({}), reconnecting", e);
            if let Some(shell) = self.shell_session_mut(key) {
                shell.drop_writer();
                shell.mark_disconnected(Some(e.to_string()));
                shell.push_banner("Reconnecting...");
            }
            self.pumps.remove(key);
            self.ensure_connected(key).await?;
            reconnected = true;

            if let Some(shell) = self.shell_session_mut(key) {
                shell.record_submit_retry(&command);
                if let Err(e) = shell.write_line(&command, limit).await {
                    shell.drop_writer();
                    shell.mark_disconnected(Some(e.to_string()));
                    self.pumps.remove(key);
                    return Err(CoreError::Io(e));
                }
            }
        }

        Ok(if reconnected {
            SubmitOutcome::Reconnected
        } else {
            SubmitOutcome::Sent
        })
    }

    /// Like [`Self::submit_input`] but never waits on the runtime. A shell
    /// that is not connected, or whose write fails, gets a background
    /// connect and the command is queued until
    /// [`Self::flush_queued`] runs after the connect lands.
    pub async fn submit_or_queue(&mut self, key: &SessionKey, text: &str) -> Result<SubmitOutcome> {
        let command = text.trim().to_string();
        let limit = self.settings.call_timeout;
        let connected = {
            let shell = self
                .shell_session_mut(key)
                .ok_or_else(|| CoreError::SessionNotFound(key.container_id.short().to_string()))?;
            if let ShellState::Unavailable(reason) = shell.state() {
                return Err(CoreError::ShellUnavailable(reason.clone()));
            }
            if command.is_empty() {
                return Ok(SubmitOutcome::Ignored);
            }
            if command == "exit" {
                shell.record_submit(&command);
                shell.close_for_exit();
                self.pumps.remove(key);
                self.queued.remove(key);
                return Ok(SubmitOutcome::Closed);
            }
            shell.is_connected()
        };

        if !connected {
            return self.queue_and_connect(key, command, false);
        }

        let write = match self.shell_session_mut(key) {
            Some(shell) => {
                shell.record_submit(&command);
                shell.write_line(&command, limit).await
            }
            None => return Err(CoreError::SessionNotFound(key.container_id.short().to_string())),
        };
        match write {
            Ok(()) => Ok(SubmitOutcome::Sent),
            Err(e) => {
                tracing::info!("shell write failed ({}), reconnecting", e);
                if let Some(shell) = self.shell_session_mut(key) {
                    shell.drop_writer();
                    shell.mark_disconnected(Some(e.to_string()));
                }
                self.pumps.remove(key);
                self.queue_and_connect(key, command, true)
            }
        }
    }

    fn queue_and_connect(&mut self, key: &SessionKey, command: String, retry: bool) -> Result<SubmitOutcome> {
        if let Some(shell) = self.shell_session_mut(key) {
            shell.push_banner("Reconnecting...");
        }
        self.queued.insert(key.clone(), QueuedInput { command, retry });
        if let Err(e) = self.connect(key) {
            self.queued.remove(key);
            return Err(e);
        }
        Ok(SubmitOutcome::Queued)
    }

    pub fn has_queued_input(&self, key: &SessionKey) -> bool {
        self.queued.contains_key(key)
    }

    /// Send the command queued by [`Self::submit_or_queue`] once the shell
    /// is connected again. A failed write here is not retried.
    pub async fn flush_queued(&mut self, key: &SessionKey) -> Result<Option<SubmitOutcome>> {
        let connected = self.shell_session(key).map(ShellSession::is_connected).unwrap_or(false);
        if !connected {
            return Ok(None);
        }
        let Some(queued) = self.queued.remove(key) else {
            return Ok(None);
        };
        let limit = self.settings.call_timeout;
        let Some(shell) = self.shell_session_mut(key) else {
            return Ok(None);
        };
        if queued.retry {
            shell.record_submit_retry(&queued.command);
        } else {
            shell.record_submit(&queued.command);
        }
        if let Err(e) = shell.write_line(&queued.command, limit).await {
            shell.drop_writer();
            shell.mark_disconnected(Some(e.to_string()));
            self.pumps.remove(key);
            return Err(CoreError::Io(e));
        }
        Ok(Some(SubmitOutcome::Reconnected))
    }
}

/// Probe the container and open an interactive shell
async fn connect_shell(
    runtime: Arc<dyn ContainerRuntime>,
    container_id: ContainerId,
    candidates: Vec<String>,
    limit: Duration,
) -> ConnectResult {
    match bounded(limit, check_exec_capability(runtime.as_ref(), &container_id, &candidates)).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(ConnectFailure::Unavailable(
                "container is not running or has no usable shell".to_string(),
            ))
        }
        Err(e) => return Err(ConnectFailure::Failed(e)),
    }
    match bounded(limit, open_exec_session(runtime.as_ref(), &container_id, &candidates)).await {
        Ok(exec) => Ok(exec),
        Err(e @ (ProviderError::NoShellAvailable(_) | ProviderError::ContainerNotRunning(_))) => {
            Err(ConnectFailure::Unavailable(e.to_string()))
        }
        Err(e) => Err(ConnectFailure::Failed(e)),
    }
}

async fn log_pump(
    runtime: Arc<dyn ContainerRuntime>,
    key: SessionKey,
    epoch: u64,
    config: LogConfig,
    limit: Duration,
    tx: mpsc::UnboundedSender<SessionEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut stream = match bounded(limit, runtime.logs(&key.container_id, &config)).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx.send(SessionEvent::LogEnded {
                key,
                epoch,
                error: Some(e.to_string()),
            });
            return;
        }
    };

    loop {
        tokio::select! {
            _ = stop.changed() => {
                tracing::debug!("log pump for {} stopped", key.container_id.short());
                return;
            }
            line = stream.next_line() => {
                let event = match line {
                    Ok(Some(line)) => SessionEvent::LogLines { key: key.clone(), epoch, lines: vec![line] },
                    Ok(None) => {
                        let _ = tx.send(SessionEvent::LogEnded { key, epoch, error: None });
                        return;
                    }
                    Err(e) => {
                        let _ = tx.send(SessionEvent::LogEnded { key, epoch, error: Some(e.to_string()) });
                        return;
                    }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

async fn shell_pump(
    key: SessionKey,
    epoch: u64,
    mut output: std::pin::Pin<Box<dyn AsyncRead + Send>>,
    tx: mpsc::UnboundedSender<SessionEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        tokio::select! {
            _ = stop.changed() => return,
            read = output.read(&mut buf) => {
                let event = match read {
                    Ok(0) => {
                        let _ = tx.send(SessionEvent::ShellClosed { key, epoch, error: None });
                        return;
                    }
                    Ok(n) => SessionEvent::ShellOutput { key: key.clone(), epoch, bytes: buf[..n].to_vec() },
                    Err(e) => {
                        let _ = tx.send(SessionEvent::ShellClosed { key, epoch, error: Some(e.to_string()) });
                        return;
                    }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}
