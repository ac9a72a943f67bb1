//! Application state and main event loop

use crate::event::{Event, EventHandler};
use crate::keymap::{self, Action, FilterEdit, LifecycleOp, Pane, UiMode};
use crate::ui;
use crate::widgets::{DialogFocus, TextInputState};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dockman_config::GlobalConfig;
use dockman_core::session::{
    EditorAction, MatchNav, SessionEvent, SessionKey, SessionKind, SessionManager,
    SessionSettings, ShellKey, ShellState, SubmitOutcome, Viewport,
};
use dockman_core::{
    bounded, Controller, CoreError, PollResult, Poller, ProjectReport, ReconcileOutcome,
    Reconciler,
};
use dockman_provider::{ActionOutcome, ContainerDetails, ContainerId, ContainerRuntime, ProviderError};
use ratatui::prelude::*;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// An operation waiting for a yes/no answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Container {
        op: LifecycleOp,
        id: ContainerId,
        name: String,
    },
    Project {
        op: LifecycleOp,
        project: String,
    },
}

impl ConfirmAction {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Container { op, .. } | Self::Project { op, .. } => op.label(),
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::Container { op, name, .. } => {
                format!("{} container '{}'?", op.label(), name)
            }
            Self::Project { op, project } => {
                format!("{} every container of project '{}'?", op.label(), project)
            }
        }
    }
}

/// Container shown on the action screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: ContainerId,
    /// Reconciler record id
    pub short_id: String,
    pub name: String,
}

/// Result of the last inspect call for the info pane
#[derive(Debug, Clone)]
pub enum InfoState {
    Loaded(Box<ContainerDetails>),
    Failed(String),
}

/// Result of a runtime call made off the event loop
#[derive(Debug)]
enum TaskOutcome {
    Container {
        op: LifecycleOp,
        id: ContainerId,
        name: String,
        result: Result<ActionOutcome, CoreError>,
    },
    Project {
        op: LifecycleOp,
        project: String,
        result: Result<ProjectReport, CoreError>,
    },
    Info {
        id: ContainerId,
        result: Result<ContainerDetails, ProviderError>,
    },
    /// The task panicked before it could report
    Lost(String),
}

#[derive(Debug)]
struct TaskDone {
    id: u64,
    outcome: TaskOutcome,
}

/// Application state
pub struct App {
    pub config: GlobalConfig,
    pub reconciler: Reconciler,
    pub sessions: SessionManager,

    pub mode: UiMode,
    /// Mode to go back to when help closes
    help_return: UiMode,
    pub target: Option<Target>,
    pub pane: Pane,

    pub filter_input: TextInputState,
    /// Filter in effect before editing started, restored on cancel
    filter_before: String,

    pub info: Option<InfoState>,
    pub info_scroll: u16,

    pub confirm: Option<ConfirmAction>,
    pub dialog_focus: DialogFocus,

    pub status_message: Option<String>,
    /// Bells rung since start
    pub bells: u64,
    pending_bell: bool,
    dirty: bool,
    pub should_quit: bool,

    controller: Controller,
    poller: Poller,
    poll_rx: mpsc::UnboundedReceiver<PollResult>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    /// Labels of runtime calls still running, oldest first
    busy: Vec<(u64, String)>,
    next_task: u64,
    task_tx: mpsc::UnboundedSender<TaskDone>,
    task_rx: mpsc::UnboundedReceiver<TaskDone>,
}

impl App {
    /// Create the application. Nothing is fetched until the first poll.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: GlobalConfig) -> Self {
        let controller = Controller::from_config(runtime.clone(), &config);
        let (poller, poll_rx) = Poller::new(runtime.clone(), config.call_timeout());
        let (sessions, session_rx) = SessionManager::new(runtime, SessionSettings::from(&config));
        let (task_tx, task_rx) = mpsc::unbounded_channel();

        Self {
            config,
            reconciler: Reconciler::new(),
            sessions,
            mode: UiMode::Dashboard,
            help_return: UiMode::Dashboard,
            target: None,
            pane: Pane::Logs,
            filter_input: TextInputState::new(),
            filter_before: String::new(),
            info: None,
            info_scroll: 0,
            confirm: None,
            dialog_focus: DialogFocus::default(),
            status_message: None,
            bells: 0,
            pending_bell: false,
            dirty: true,
            should_quit: false,
            controller,
            poller,
            poll_rx,
            session_rx,
            busy: Vec::new(),
            next_task: 0,
            task_tx,
            task_rx,
        }
    }

    /// Run until the user quits
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> AppResult<()> {
        let mut events = EventHandler::new(Duration::from_millis(250));
        let mut poll_tick = tokio::time::interval(self.config.poll_interval());
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render_tick = tokio::time::interval(self.config.render_interval());
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.should_quit {
            tokio::select! {
                Some(event) = events.next() => {
                    let is_key = matches!(event, Event::Key(_));
                    self.handle_event(event).await?;
                    if is_key {
                        self.render(terminal)?;
                    }
                }
                _ = poll_tick.tick() => {
                    self.request_poll();
                }
                Some(result) = self.poll_rx.recv() => {
                    self.on_poll_result(result);
                }
                Some(event) = self.session_rx.recv() => {
                    self.on_session_event(event).await;
                }
                Some(done) = self.task_rx.recv() => {
                    self.on_task_done(done);
                }
                _ = render_tick.tick() => {
                    self.render(terminal)?;
                }
            }
        }

        self.sessions.close_all();
        Ok(())
    }

    fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> AppResult<()> {
        if self.pending_bell {
            self.pending_bell = false;
            let mut stdout = std::io::stdout();
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
        }
        if self.dirty {
            self.dirty = false;
            terminal.draw(|frame| ui::draw(frame, self))?;
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) -> AppResult<()> {
        match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key).await?;
                }
            }
            Event::Resize(_, _) => {
                self.dirty = true;
            }
            Event::Tick => {}
        }
        Ok(())
    }

    /// Handle a key press through the mode's binding table
    pub async fn handle_key(&mut self, key: KeyEvent) -> AppResult<()> {
        self.dirty = true;
        let Some(action) = keymap::action_for(self.mode, key) else {
            return Ok(());
        };
        tracing::trace!("{:?} in {:?}", action, self.mode);
        // A message lasts until the next bound key
        self.status_message = None;
        self.perform(action).await
    }

    /// Simulate a key press
    pub async fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> AppResult<()> {
        self.handle_key(KeyEvent::new(code, modifiers)).await
    }

    async fn perform(&mut self, action: Action) -> AppResult<()> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Back => self.back(),
            Action::ShowHelp => {
                self.help_return = self.mode;
                self.mode = UiMode::Help;
            }
            Action::FocusNext => self.reconciler.move_focus(1),
            Action::FocusPrev => self.reconciler.move_focus(-1),
            Action::FocusFirst => self.reconciler.move_focus(-(self.reconciler.len() as isize)),
            Action::FocusLast => self.reconciler.move_focus(self.reconciler.len() as isize),
            Action::NextGroup => self.cycle_group(1),
            Action::PrevGroup => self.cycle_group(-1),
            Action::Refresh => {
                if !self.request_poll() {
                    self.status_message = Some("Refresh already in progress".to_string());
                }
            }
            Action::Container(op) => self.begin_container_op(op),
            Action::Project(op) => self.begin_project_op(op),
            Action::Open(pane) => self.open_pane(pane),
            Action::NextPane => self.open_pane(self.pane.next()),
            Action::ScrollUp
            | Action::ScrollDown
            | Action::PageUp
            | Action::PageDown
            | Action::ScrollTop
            | Action::ScrollBottom => self.scroll(action),
            Action::BeginFilter => self.begin_filter(),
            Action::EditFilter(edit) => self.edit_filter(edit),
            Action::ApplyFilter => self.apply_filter(),
            Action::ClearFilter => {
                self.filter_input.clear();
                if let Some(session) = self.log_session_key().and_then(|k| self.sessions.log_session_mut(&k)) {
                    session.clear_filter();
                }
            }
            Action::NextMatch => self.step_match(true),
            Action::PrevMatch => self.step_match(false),
            Action::Shell(key) => self.shell_key(key).await,
            Action::Confirm => self.confirm_selected(),
            Action::Cancel => self.cancel_confirm(),
            Action::ToggleDialogFocus => self.dialog_focus = self.dialog_focus.toggle(),
            Action::DialogSelect => match self.dialog_focus {
                DialogFocus::Confirm => self.confirm_selected(),
                DialogFocus::Cancel => self.cancel_confirm(),
            },
        }
        Ok(())
    }

    fn back(&mut self) {
        match self.mode {
            UiMode::Help => self.mode = self.help_return,
            UiMode::Confirm => self.cancel_confirm(),
            UiMode::LogFilter => {
                let previous = std::mem::take(&mut self.filter_before);
                if let Some(session) = self.log_session_key().and_then(|k| self.sessions.log_session_mut(&k)) {
                    session.set_filter(&previous);
                }
                self.filter_input.set_value(&previous);
                self.mode = UiMode::Logs;
            }
            UiMode::Logs | UiMode::Shell | UiMode::Info => self.close_action_screen(),
            UiMode::Dashboard => {
                if self.reconciler.active_group().is_some() {
                    self.reconciler.set_active_group(None);
                }
            }
        }
    }

    // Polling

    /// Start a poll unless one is in flight
    pub fn request_poll(&mut self) -> bool {
        let started = self.poller.dispatch(&mut self.reconciler);
        if !started {
            tracing::debug!("poll skipped, previous pass still running");
        }
        started
    }

    /// Wait for the running poll to finish and apply it
    pub async fn wait_for_poll(&mut self) -> Option<ReconcileOutcome> {
        let result = self.poll_rx.recv().await?;
        Some(self.on_poll_result(result))
    }

    /// Poll and apply the result in one go
    pub async fn refresh(&mut self) -> Option<ReconcileOutcome> {
        if !self.request_poll() {
            return None;
        }
        self.wait_for_poll().await
    }

    fn on_poll_result(&mut self, result: PollResult) -> ReconcileOutcome {
        let outcome = self.reconciler.complete_pass(result);
        match &outcome {
            ReconcileOutcome::Failed(e) => tracing::warn!("poll failed: {}", e),
            ReconcileOutcome::Rebuilt { added, removed } => {
                tracing::debug!("rebuilt groups: {} added, {} removed", added, removed)
            }
            _ => {}
        }
        if outcome.is_visible_change() {
            self.dirty = true;
        }
        if let Some(target) = &self.target {
            if self.reconciler.error().is_none() && self.reconciler.record(&target.short_id).is_none() {
                self.status_message = Some(format!("Container '{}' no longer exists", target.name));
            }
        }
        outcome
    }

    fn cycle_group(&mut self, delta: isize) {
        let names = self.reconciler.group_names();
        if names.is_empty() {
            return;
        }
        // Position 0 is "all groups"
        let slots = names.len() as isize + 1;
        let current = self
            .reconciler
            .active_group()
            .and_then(|g| names.iter().position(|n| n == g))
            .map(|i| i as isize + 1)
            .unwrap_or(0);
        let next = (current + delta).rem_euclid(slots);
        let name = (next > 0).then(|| names[(next - 1) as usize].as_str());
        self.reconciler.set_active_group(name);
    }

    // Sessions

    /// Apply one event from a pump; returns whether it was current
    pub async fn on_session_event(&mut self, event: SessionEvent) -> bool {
        let connected = match &event {
            SessionEvent::ShellConnected { key, .. } => Some(key.clone()),
            _ => None,
        };
        let applied = self.sessions.apply(event);
        if applied {
            self.dirty = true;
            if let Some(key) = connected {
                self.after_shell_connect(&key).await;
            }
        }
        applied
    }

    /// Wait for the next pump event and apply it
    pub async fn next_session_event(&mut self) -> Option<bool> {
        let event = self.session_rx.recv().await?;
        Some(self.on_session_event(event).await)
    }

    /// Report the connect outcome and send any command typed meanwhile
    async fn after_shell_connect(&mut self, key: &SessionKey) {
        let visible = self.shell_session_key().as_ref() == Some(key);
        let Some(state) = self.sessions.shell_session(key).map(|s| s.state().clone()) else {
            return;
        };
        match state {
            ShellState::Connected => match self.sessions.flush_queued(key).await {
                Ok(Some(_)) if visible => self.status_message = None,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("shell write failed: {}", e);
                    if visible {
                        self.status_message = Some(format!("Shell error: {}", e));
                    }
                }
            },
            ShellState::Unavailable(reason) if visible => {
                self.status_message = Some(format!("Shell unavailable: {}", reason));
            }
            ShellState::Disconnected if visible => {
                self.status_message = Some("Shell connection failed".to_string());
            }
            _ => {}
        }
    }

    pub fn log_session_key(&self) -> Option<SessionKey> {
        self.target.as_ref().map(|t| SessionKey::logs(t.id.clone()))
    }

    pub fn shell_session_key(&self) -> Option<SessionKey> {
        self.target.as_ref().map(|t| SessionKey::shell(t.id.clone()))
    }

    fn open_pane(&mut self, pane: Pane) {
        if self.target.is_none() {
            let Some(record) = self.reconciler.focused() else {
                self.bell();
                return;
            };
            self.target = Some(Target {
                id: record.full_id.clone(),
                short_id: record.id.clone(),
                name: record.name.clone(),
            });
        }
        let Some(target) = self.target.clone() else {
            return;
        };

        self.pane = pane;
        self.mode = pane.mode();
        match pane {
            Pane::Logs => {
                let key = self.sessions.open(&target.id, &target.name, SessionKind::Logs);
                let filter = self
                    .sessions
                    .log_session(&key)
                    .map(|s| s.filter().to_string())
                    .unwrap_or_default();
                self.filter_input.set_value(&filter);
            }
            Pane::Shell => {
                let key = self.sessions.open(&target.id, &target.name, SessionKind::Shell);
                if let Err(e) = self.sessions.connect(&key) {
                    tracing::debug!("shell for {} not connected: {}", target.name, e);
                    self.status_message = Some(e.to_string());
                }
            }
            Pane::Info => self.load_info(&target),
        }
    }

    /// Inspect in the background; the pane shows a placeholder until then
    fn load_info(&mut self, target: &Target) {
        self.info = None;
        self.info_scroll = 0;
        let runtime = self.controller.runtime().clone();
        let limit = self.config.call_timeout();
        let id = target.id.clone();
        self.spawn_task(format!("Inspecting {}...", target.name), async move {
            let result = bounded(limit, runtime.inspect(&id)).await;
            TaskOutcome::Info { id, result }
        });
    }

    fn close_action_screen(&mut self) {
        if let Some(target) = self.target.take() {
            self.sessions.close_container(&target.id);
        }
        self.info = None;
        self.filter_input.clear();
        self.filter_before.clear();
        self.pane = Pane::Logs;
        self.mode = UiMode::Dashboard;
    }

    fn scroll(&mut self, action: Action) {
        fn apply(viewport: &mut Viewport, action: Action, total: usize) {
            match action {
                Action::ScrollUp => viewport.scroll_up(1),
                Action::ScrollDown => viewport.scroll_down(1, total),
                Action::PageUp => viewport.page_up(),
                Action::PageDown => viewport.page_down(total),
                Action::ScrollTop => viewport.scroll_to_top(),
                Action::ScrollBottom => viewport.scroll_to_bottom(total),
                _ => {}
            }
        }

        match self.mode {
            UiMode::Logs => {
                if let Some(s) = self.log_session_key().and_then(|k| self.sessions.log_session_mut(&k)) {
                    let total = s.len();
                    apply(&mut s.viewport, action, total);
                }
            }
            UiMode::Shell => {
                if let Some(s) = self.shell_session_key().and_then(|k| self.sessions.shell_session_mut(&k)) {
                    let total = s.len();
                    apply(&mut s.viewport, action, total);
                }
            }
            UiMode::Info => {
                self.info_scroll = match action {
                    Action::ScrollUp => self.info_scroll.saturating_sub(1),
                    Action::ScrollDown => self.info_scroll.saturating_add(1),
                    Action::PageUp => self.info_scroll.saturating_sub(10),
                    Action::PageDown => self.info_scroll.saturating_add(10),
                    Action::ScrollTop => 0,
                    _ => self.info_scroll,
                };
            }
            _ => {}
        }
    }

    fn begin_filter(&mut self) {
        let current = self
            .log_session_key()
            .and_then(|k| self.sessions.log_session(&k))
            .map(|s| s.filter().to_string())
            .unwrap_or_default();
        self.filter_input.set_value(&current);
        self.filter_before = current;
        self.mode = UiMode::LogFilter;
    }

    /// Matches follow the text as it is typed
    fn edit_filter(&mut self, edit: FilterEdit) {
        if !self.filter_input.apply(edit) {
            return;
        }
        let text = self.filter_input.value().to_string();
        if let Some(session) = self.log_session_key().and_then(|k| self.sessions.log_session_mut(&k)) {
            session.set_filter(&text);
        }
    }

    fn apply_filter(&mut self) {
        let text = self.filter_input.value().to_string();
        let key = self.log_session_key();
        if let Some(session) = key.and_then(|k| self.sessions.log_session_mut(&k)) {
            session.set_filter(&text);
            if !text.is_empty() && session.match_count() == 0 {
                self.status_message = Some(format!("No matches for '{}'", text));
            }
        }
        self.filter_before.clear();
        self.mode = UiMode::Logs;
    }

    fn step_match(&mut self, forward: bool) {
        let Some(session) = self.log_session_key().and_then(|k| self.sessions.log_session_mut(&k)) else {
            return;
        };
        let nav = if forward {
            session.next_match()
        } else {
            session.prev_match()
        };
        if nav == MatchNav::Bell {
            self.bell();
        }
    }

    async fn shell_key(&mut self, key: ShellKey) {
        let Some(session_key) = self.shell_session_key() else {
            return;
        };
        let action = match self.sessions.shell_session_mut(&session_key) {
            Some(session) => session.handle_key(key),
            None => return,
        };
        let EditorAction::Submit(line) = action else {
            return;
        };
        match self.sessions.submit_or_queue(&session_key, &line).await {
            Ok(SubmitOutcome::Closed) => {
                self.status_message = Some("Shell session closed".to_string());
            }
            Ok(SubmitOutcome::Queued) => {
                self.status_message = Some("Reconnecting shell...".to_string());
            }
            Ok(SubmitOutcome::Sent | SubmitOutcome::Reconnected | SubmitOutcome::Ignored) => {}
            Err(CoreError::ShellUnavailable(reason)) => {
                self.status_message = Some(format!("Shell unavailable: {}", reason));
                self.bell();
            }
            Err(e) => {
                tracing::warn!("shell write failed: {}", e);
                self.status_message = Some(format!("Shell error: {}", e));
            }
        }
    }

    // Lifecycle actions

    fn begin_container_op(&mut self, op: LifecycleOp) {
        let Some(record) = self.reconciler.focused() else {
            self.bell();
            return;
        };
        let action = ConfirmAction::Container {
            op,
            id: record.full_id.clone(),
            name: record.name.clone(),
        };
        self.ask_or_run(op, action);
    }

    fn begin_project_op(&mut self, op: LifecycleOp) {
        let project = self
            .reconciler
            .focused()
            .and_then(|r| r.project.clone());
        let Some(project) = project else {
            self.status_message = Some("Container is not part of a Compose project".to_string());
            self.bell();
            return;
        };
        self.ask_or_run(op, ConfirmAction::Project { op, project });
    }

    fn ask_or_run(&mut self, op: LifecycleOp, action: ConfirmAction) {
        if op.needs_confirm() {
            self.confirm = Some(action);
            self.dialog_focus = DialogFocus::default();
            self.mode = UiMode::Confirm;
        } else {
            self.execute(action);
        }
    }

    fn confirm_selected(&mut self) {
        self.mode = UiMode::Dashboard;
        if let Some(action) = self.confirm.take() {
            self.execute(action);
        }
    }

    fn cancel_confirm(&mut self) {
        self.confirm = None;
        self.mode = UiMode::Dashboard;
    }

    /// Run the action in the background; the result comes back through
    /// [`Self::on_task_done`]
    fn execute(&mut self, action: ConfirmAction) {
        let controller = self.controller.clone();
        match action {
            ConfirmAction::Container { op, id, name } => {
                let label = format!("{} {}...", op.progress_label(), name);
                self.spawn_task(label, async move {
                    let result = match op {
                        LifecycleOp::Start => controller.start(&id).await,
                        LifecycleOp::Stop => controller.stop(&id).await,
                        LifecycleOp::Restart => controller.restart(&id).await,
                        LifecycleOp::Remove => controller.remove(&id, true).await,
                    };
                    TaskOutcome::Container { op, id, name, result }
                });
            }
            ConfirmAction::Project { op, project } => {
                let label = format!("{} project {}...", op.progress_label(), project);
                self.spawn_task(label, async move {
                    let result = match op {
                        LifecycleOp::Start => controller.start_project(&project).await,
                        LifecycleOp::Stop => controller.stop_project(&project).await,
                        LifecycleOp::Restart => controller.restart_project(&project).await,
                        LifecycleOp::Remove => controller.remove_project(&project).await,
                    };
                    TaskOutcome::Project { op, project, result }
                });
            }
        }
    }

    // Background tasks

    fn spawn_task<F>(&mut self, label: String, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        self.next_task += 1;
        let id = self.next_task;
        tracing::debug!("task {}: {}", id, label);
        self.busy.push((id, label));
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let outcome = match tokio::spawn(task).await {
                Ok(outcome) => outcome,
                Err(e) => TaskOutcome::Lost(e.to_string()),
            };
            let _ = tx.send(TaskDone { id, outcome });
        });
    }

    /// Label of the newest runtime call still running
    pub fn busy_label(&self) -> Option<&str> {
        self.busy.last().map(|(_, label)| label.as_str())
    }

    pub fn tasks_running(&self) -> usize {
        self.busy.len()
    }

    /// Wait for the next background task to finish and apply its result
    pub async fn wait_for_task(&mut self) -> bool {
        match self.task_rx.recv().await {
            Some(done) => {
                self.on_task_done(done);
                true
            }
            None => false,
        }
    }

    fn on_task_done(&mut self, done: TaskDone) {
        self.busy.retain(|(id, _)| *id != done.id);
        self.dirty = true;
        match done.outcome {
            TaskOutcome::Container { op, id, name, result } => {
                self.status_message = Some(match result {
                    Ok(_) => {
                        if op == LifecycleOp::Remove {
                            self.sessions.close_container(&id);
                        }
                        format!("{}: {} done", name, op.label().to_lowercase())
                    }
                    Err(e) => {
                        tracing::warn!("{} {} failed: {}", op.label(), name, e);
                        format!("{} {} failed: {}", op.label(), name, e)
                    }
                });
                self.request_poll();
            }
            TaskOutcome::Project { op, project, result } => {
                self.status_message = Some(match result {
                    Ok(report) => project_summary(op, &report),
                    Err(e) => format!("{} {} failed: {}", op.label(), project, e),
                });
                self.request_poll();
            }
            TaskOutcome::Info { id, result } => {
                // the user may have moved on to another container
                if self.target.as_ref().map(|t| &t.id) != Some(&id) {
                    return;
                }
                self.info = Some(match result {
                    Ok(details) => InfoState::Loaded(Box::new(details)),
                    Err(e) => InfoState::Failed(e.to_string()),
                });
            }
            TaskOutcome::Lost(e) => {
                tracing::error!("background task failed: {}", e);
                self.status_message = Some(format!("Background task failed: {}", e));
            }
        }
    }

    fn bell(&mut self) {
        self.bells += 1;
        self.pending_bell = true;
    }
}

fn project_summary(op: LifecycleOp, report: &ProjectReport) -> String {
    let total = report.succeeded.len() + report.failed.len();
    match report.failed.first() {
        None => format!(
            "{} {}: {}/{} containers",
            op.label(),
            report.project,
            report.succeeded.len(),
            total
        ),
        Some((name, error)) => format!(
            "{} {}: {} of {} failed ({}: {})",
            op.label(),
            report.project,
            report.failed.len(),
            total,
            name,
            error
        ),
    }
}
