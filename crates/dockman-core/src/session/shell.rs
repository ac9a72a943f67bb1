//! Interactive shell view state
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> Connecting ...
//!                     |
//!                     +-> Unavailable (terminal until the view is reopened)
//! ```
//!
//! While connected the last buffer entry is always [`ShellLine::Prompt`];
//! output lines are inserted just above it.

use super::buffer::LineBuffer;
use super::input::{EditorAction, History, ShellKey, ShellLineEditor};
use super::scroll::Viewport;
use super::terminal::{OutputAssembler, TermEvent, TermLine};
use dockman_provider::ContainerId;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const TRUNCATED_MARKER: &str = "... older output truncated ...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
    Disconnected,
    Connecting,
    Connected,
    /// No shell can be opened; input stays disabled
    Unavailable(String),
}

impl std::fmt::Display for ShellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Unavailable(_) => write!(f, "unavailable"),
        }
    }
}

/// One entry of the shell transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellLine {
    Output(TermLine),
    /// A command as the user submitted it, with the prompt it was typed at
    Echo(String),
    Banner(String),
    Prompt,
    Truncated,
}

/// A submitted command whose remote echo has not arrived yet
#[derive(Debug, Clone)]
struct PendingEcho {
    /// Prompt text the command was typed at
    prompt: String,
    command: String,
}

impl PendingEcho {
    /// The shell echoes the command alone, or reprints the prompt with it
    fn matches(&self, line: &str) -> bool {
        let line = line.trim_end();
        let command = self.command.trim_end();
        line == command || line.strip_prefix(self.prompt.as_str()) == Some(command)
    }
}

/// One open shell view
pub struct ShellSession {
    container_id: ContainerId,
    name: String,
    state: ShellState,
    shell: Option<String>,
    buffer: LineBuffer<ShellLine>,
    assembler: OutputAssembler,
    writer: Option<Pin<Box<dyn AsyncWrite + Send>>>,
    history: History,
    editor: ShellLineEditor,
    awaiting_echo: Option<PendingEcho>,
    /// Start of the redraw region while a full-screen program runs
    frame_start: Option<usize>,
    epoch: u64,
    connects: u32,
    pub viewport: Viewport,
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("container_id", &self.container_id)
            .field("state", &self.state)
            .field("shell", &self.shell)
            .field("lines", &self.buffer.len())
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl ShellSession {
    pub fn new(container_id: ContainerId, name: impl Into<String>, cap: usize) -> Self {
        Self {
            container_id,
            name: name.into(),
            state: ShellState::Disconnected,
            shell: None,
            buffer: LineBuffer::new(cap.max(2)),
            assembler: OutputAssembler::new(),
            writer: None,
            history: History::default(),
            editor: ShellLineEditor::default(),
            awaiting_echo: None,
            frame_start: None,
            epoch: 0,
            connects: 0,
            viewport: Viewport::default(),
        }
    }

    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn shell(&self) -> Option<&str> {
        self.shell.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Connected with an open input handle
    pub fn is_connected(&self) -> bool {
        self.state == ShellState::Connected && self.writer.is_some()
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, ShellState::Unavailable(_))
    }

    /// A full-screen program is redrawing in place
    pub fn is_full_screen(&self) -> bool {
        self.frame_start.is_some()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn editor(&self) -> &ShellLineEditor {
        &self.editor
    }

    pub fn lines(&self) -> impl Iterator<Item = &ShellLine> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Feed a key to the prompt editor
    pub fn handle_key(&mut self, key: ShellKey) -> EditorAction {
        if self.is_unavailable() {
            return EditorAction::None;
        }
        self.editor.translate(key, &self.history)
    }

    pub(crate) fn begin_connect(&mut self) {
        self.state = ShellState::Connecting;
    }

    /// Take over a freshly opened exec session
    pub(crate) fn attach(&mut self, epoch: u64, shell: String, writer: Pin<Box<dyn AsyncWrite + Send>>) {
        self.connects += 1;
        let banner = if self.connects == 1 {
            format!("Connected to {} ({})", self.name, shell)
        } else {
            format!("Reconnected to {} ({})", self.name, shell)
        };
        self.buffer.clear();
        self.assembler = OutputAssembler::new();
        self.awaiting_echo = None;
        self.frame_start = None;
        self.epoch = epoch;
        self.shell = Some(shell);
        self.writer = Some(writer);
        self.state = ShellState::Connected;
        self.buffer.push(ShellLine::Banner(banner));
        self.buffer.push(ShellLine::Prompt);
        self.viewport.scroll_to_bottom(self.buffer.len());
    }

    /// The runtime refused a shell; input stays off for this view
    pub(crate) fn mark_unavailable(&mut self, reason: String) {
        self.writer = None;
        self.remove_prompt();
        self.push_banner(format!("Shell unavailable: {}", reason));
        self.state = ShellState::Unavailable(reason);
    }

    /// Stream ended or failed; the next submit reconnects
    pub(crate) fn mark_disconnected(&mut self, reason: Option<String>) {
        if self.state == ShellState::Disconnected && self.writer.is_none() {
            return;
        }
        self.writer = None;
        self.awaiting_echo = None;
        self.frame_start = None;
        for event in self.assembler.flush() {
            if let TermEvent::Line(line) = event {
                self.insert_output(ShellLine::Output(line));
            }
        }
        self.remove_prompt();
        let banner = match reason {
            Some(reason) => format!("Disconnected: {}", reason),
            None => "Session closed".to_string(),
        };
        self.push_banner(banner);
        if !self.is_unavailable() {
            self.state = ShellState::Disconnected;
        }
    }

    /// Connect attempt failed without making the shell unavailable
    pub(crate) fn connect_failed(&mut self, reason: String) {
        self.writer = None;
        self.remove_prompt();
        self.push_banner(format!("Connection failed: {}", reason));
        self.state = ShellState::Disconnected;
    }

    pub fn push_banner(&mut self, text: impl Into<String>) {
        self.insert_output(ShellLine::Banner(text.into()));
    }

    fn remove_prompt(&mut self) {
        if self.buffer.back() == Some(&ShellLine::Prompt) {
            self.buffer.pop_back();
        }
    }

    /// Number of entries above the prompt
    fn output_len(&self) -> usize {
        match self.buffer.back() {
            Some(ShellLine::Prompt) => self.buffer.len() - 1,
            _ => self.buffer.len(),
        }
    }

    fn truncate_output(&mut self, len: usize) {
        let had_prompt = self.buffer.back() == Some(&ShellLine::Prompt);
        if had_prompt {
            self.buffer.pop_back();
        }
        self.buffer.truncate(len);
        if had_prompt {
            self.buffer.push(ShellLine::Prompt);
        }
        self.viewport.scroll_to_bottom(self.buffer.len());
    }

    fn insert_output(&mut self, line: ShellLine) {
        let total = self.buffer.len();
        let was_at_bottom = self.viewport.is_at_bottom(total);
        let evicted = if self.buffer.back() == Some(&ShellLine::Prompt) {
            self.buffer.insert_before_last(line)
        } else {
            self.buffer.push(line)
        };
        let mut dropped = 0;
        if evicted.is_some() {
            dropped = 1;
            self.frame_start = self.frame_start.map(|f| f.saturating_sub(1));
            if self.buffer.front() != Some(&ShellLine::Truncated) {
                if let Some(front) = self.buffer.front_mut() {
                    *front = ShellLine::Truncated;
                }
            }
        }
        self.viewport
            .after_append(was_at_bottom, self.buffer.len(), dropped);
    }

    /// Process a chunk of output from the exec stream
    pub fn apply_output(&mut self, bytes: &[u8]) {
        for event in self.assembler.feed(bytes) {
            match event {
                TermEvent::Line(line) => {
                    if let Some(pending) = self.awaiting_echo.take() {
                        if pending.matches(&line.plain) {
                            continue;
                        }
                    }
                    self.insert_output(ShellLine::Output(line));
                }
                TermEvent::EnterAltScreen => {
                    self.frame_start = Some(self.output_len());
                }
                TermEvent::ClearScreen => match self.frame_start {
                    Some(start) => self.truncate_output(start),
                    None => {
                        self.truncate_output(0);
                        self.frame_start = Some(0);
                    }
                },
                TermEvent::CursorHome => {
                    if let Some(start) = self.frame_start {
                        self.truncate_output(start);
                    }
                }
                TermEvent::LeaveAltScreen => {
                    if let Some(start) = self.frame_start.take() {
                        self.truncate_output(start);
                    }
                }
            }
        }
    }

    /// The shell's own prompt text as last printed
    pub fn prompt_text(&self) -> TermLine {
        if self.awaiting_echo.is_some() {
            return TermLine::default();
        }
        self.assembler.partial()
    }

    /// Record a submitted command and show it locally; the remote echo is dropped
    pub(crate) fn record_submit(&mut self, command: &str) {
        self.history.push(command);
        self.record_submit_retry(command);
    }

    /// Echo a command again after a reconnect without touching history
    pub(crate) fn record_submit_retry(&mut self, command: &str) {
        self.editor.clear();
        self.frame_start = None;
        let prompt = self.assembler.partial().plain;
        self.assembler.discard_partial();
        self.insert_output(ShellLine::Echo(format!("{}{}", prompt, command)));
        self.awaiting_echo = Some(PendingEcho {
            prompt,
            command: command.to_string(),
        });
    }

    /// Close both handles without sending anything
    pub(crate) fn close_for_exit(&mut self) {
        self.writer = None;
        self.awaiting_echo = None;
        self.frame_start = None;
        self.assembler.discard_partial();
        self.remove_prompt();
        self.push_banner("Session closed (exit)");
        self.state = ShellState::Disconnected;
    }

    /// Write `line` followed by a newline to the shell's stdin
    pub(crate) async fn write_line(&mut self, line: &str, limit: Duration) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "shell input is closed"))?;
        let data = format!("{}\n", line);
        let write = async {
            writer.write_all(data.as_bytes()).await?;
            writer.flush().await
        };
        match tokio::time::timeout(limit, write).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write to shell timed out")),
        }
    }

    /// Forget the input handle after a failed write
    pub(crate) fn drop_writer(&mut self) {
        self.writer = None;
    }

    /// Transcript as display strings; SGR sequences are left in place
    pub fn render_lines(&self) -> Vec<String> {
        self.buffer
            .iter()
            .map(|line| match line {
                ShellLine::Output(l) => l.styled.clone(),
                ShellLine::Echo(text) => text.clone(),
                ShellLine::Banner(text) => format!("*** {} ***", text),
                ShellLine::Prompt => format!("{}{}", self.prompt_text().styled, self.editor.text()),
                ShellLine::Truncated => TRUNCATED_MARKER.to_string(),
            })
            .collect()
    }
}
