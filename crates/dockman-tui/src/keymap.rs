//! Key bindings
//!
//! Every key the application reacts to goes through [`action_for`], one
//! table keyed by the current [`UiMode`] and the key. Handlers never look at
//! raw key codes.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dockman_core::session::ShellKey;

/// What the user is currently interacting with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    /// Project groups and their containers
    Dashboard,
    /// Log pane of the action screen
    Logs,
    /// Typing a log filter
    LogFilter,
    /// Shell pane of the action screen
    Shell,
    /// Inspect pane of the action screen
    Info,
    /// Yes/no dialog over the dashboard
    Confirm,
    Help,
}

impl UiMode {
    /// Modes that belong to the per-container action screen
    pub fn is_action_screen(&self) -> bool {
        matches!(self, Self::Logs | Self::LogFilter | Self::Shell | Self::Info)
    }
}

/// Panes of the action screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Logs,
    Shell,
    Info,
}

impl Pane {
    pub fn all() -> &'static [Pane] {
        &[Pane::Logs, Pane::Shell, Pane::Info]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pane::Logs => "Logs",
            Pane::Shell => "Shell",
            Pane::Info => "Info",
        }
    }

    pub fn next(&self) -> Pane {
        match self {
            Pane::Logs => Pane::Shell,
            Pane::Shell => Pane::Info,
            Pane::Info => Pane::Logs,
        }
    }

    pub fn mode(&self) -> UiMode {
        match self {
            Pane::Logs => UiMode::Logs,
            Pane::Shell => UiMode::Shell,
            Pane::Info => UiMode::Info,
        }
    }
}

/// Lifecycle operations offered for containers and projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Start,
    Stop,
    Restart,
    Remove,
}

impl LifecycleOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Restart => "Restart",
            Self::Remove => "Delete",
        }
    }

    /// Shown while the action runs
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Restart => "Restarting",
            Self::Remove => "Deleting",
        }
    }

    /// Start is harmless; everything else asks first
    pub fn needs_confirm(&self) -> bool {
        !matches!(self, Self::Start)
    }
}

/// Edits to the filter text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEdit {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Leave the current mode
    Back,
    ShowHelp,
    FocusNext,
    FocusPrev,
    FocusFirst,
    FocusLast,
    NextGroup,
    PrevGroup,
    Refresh,
    Container(LifecycleOp),
    Project(LifecycleOp),
    Open(Pane),
    NextPane,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollTop,
    ScrollBottom,
    BeginFilter,
    EditFilter(FilterEdit),
    ApplyFilter,
    ClearFilter,
    NextMatch,
    PrevMatch,
    Shell(ShellKey),
    Confirm,
    Cancel,
    ToggleDialogFocus,
    DialogSelect,
}

/// Map a key to an action for the given mode
pub fn action_for(mode: UiMode, key: KeyEvent) -> Option<Action> {
    use Action::*;
    use KeyCode as K;

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    let action = match (mode, key.code) {
        // Ctrl+C quits except while typing at the shell prompt
        (UiMode::Shell, K::Char('c')) if ctrl => Shell(ShellKey::ClearLine),
        (_, K::Char('c')) if ctrl => Quit,

        (UiMode::Help, _) => Back,

        (UiMode::Confirm, K::Char('y') | K::Char('Y')) => Confirm,
        (UiMode::Confirm, K::Char('n') | K::Char('N') | K::Esc) => Cancel,
        (UiMode::Confirm, K::Enter) => DialogSelect,
        (UiMode::Confirm, K::Tab | K::BackTab | K::Left | K::Right) => ToggleDialogFocus,
        (UiMode::Confirm, _) => return None,

        (UiMode::LogFilter, K::Enter) => ApplyFilter,
        (UiMode::LogFilter, K::Esc) => Back,
        (UiMode::LogFilter, K::Backspace) => EditFilter(FilterEdit::Backspace),
        (UiMode::LogFilter, K::Delete) => EditFilter(FilterEdit::Delete),
        (UiMode::LogFilter, K::Left) => EditFilter(FilterEdit::Left),
        (UiMode::LogFilter, K::Right) => EditFilter(FilterEdit::Right),
        (UiMode::LogFilter, K::Home) => EditFilter(FilterEdit::Home),
        (UiMode::LogFilter, K::End) => EditFilter(FilterEdit::End),
        (UiMode::LogFilter, K::Char(c)) if !ctrl => EditFilter(FilterEdit::Insert(c)),
        (UiMode::LogFilter, _) => return None,

        (UiMode::Shell, K::Esc) => Back,
        (UiMode::Shell, K::Tab) => NextPane,
        (UiMode::Shell, K::PageUp) => PageUp,
        (UiMode::Shell, K::PageDown) => PageDown,
        (UiMode::Shell, K::Char('u')) if ctrl => Shell(ShellKey::ClearLine),
        (UiMode::Shell, K::Char('w')) if ctrl => Shell(ShellKey::DeleteWord),
        (UiMode::Shell, K::Char('a')) if ctrl => Shell(ShellKey::Home),
        (UiMode::Shell, K::Char('e')) if ctrl => Shell(ShellKey::End),
        (UiMode::Shell, K::Char(_)) if ctrl => return None,
        (UiMode::Shell, K::Char(c)) => Shell(ShellKey::Char(c)),
        (UiMode::Shell, K::Backspace) => Shell(ShellKey::Backspace),
        (UiMode::Shell, K::Delete) => Shell(ShellKey::Delete),
        (UiMode::Shell, K::Left) => Shell(ShellKey::Left),
        (UiMode::Shell, K::Right) => Shell(ShellKey::Right),
        (UiMode::Shell, K::Home) => Shell(ShellKey::Home),
        (UiMode::Shell, K::End) => Shell(ShellKey::End),
        (UiMode::Shell, K::Up) => Shell(ShellKey::Up),
        (UiMode::Shell, K::Down) => Shell(ShellKey::Down),
        (UiMode::Shell, K::Enter) => Shell(ShellKey::Enter),
        (UiMode::Shell, _) => return None,

        (UiMode::Logs | UiMode::Info, K::Esc | K::Char('q')) => Back,
        (UiMode::Logs | UiMode::Info, K::Tab) => NextPane,
        (UiMode::Logs | UiMode::Info, K::Char('l')) => Open(Pane::Logs),
        (UiMode::Logs | UiMode::Info, K::Char('e')) => Open(Pane::Shell),
        (UiMode::Logs | UiMode::Info, K::Char('i')) => Open(Pane::Info),
        (UiMode::Logs | UiMode::Info, K::Char('j') | K::Down) => ScrollDown,
        (UiMode::Logs | UiMode::Info, K::Char('k') | K::Up) => ScrollUp,
        (UiMode::Logs | UiMode::Info, K::PageDown) => PageDown,
        (UiMode::Logs | UiMode::Info, K::PageUp) => PageUp,
        (UiMode::Logs | UiMode::Info, K::Char('g') | K::Home) => ScrollTop,
        (UiMode::Logs | UiMode::Info, K::Char('G') | K::End) => ScrollBottom,
        (UiMode::Logs, K::Char('/')) => BeginFilter,
        (UiMode::Logs, K::Char('n')) => NextMatch,
        (UiMode::Logs, K::Char('N')) => PrevMatch,
        (UiMode::Logs, K::Char('c')) => ClearFilter,
        (UiMode::Logs | UiMode::Info, K::Char('?')) => ShowHelp,
        (UiMode::Logs | UiMode::Info, _) => return None,

        (UiMode::Dashboard, K::Char('q')) => Quit,
        (UiMode::Dashboard, K::Char('?') | K::F(1)) => ShowHelp,
        (UiMode::Dashboard, K::Char('j') | K::Down) => FocusNext,
        (UiMode::Dashboard, K::Char('k') | K::Up) => FocusPrev,
        (UiMode::Dashboard, K::Char('g') | K::Home) => FocusFirst,
        (UiMode::Dashboard, K::Char('G') | K::End) => FocusLast,
        (UiMode::Dashboard, K::Tab) => NextGroup,
        (UiMode::Dashboard, K::BackTab) => PrevGroup,
        (UiMode::Dashboard, K::Esc) => Back,
        (UiMode::Dashboard, K::F(5)) => Refresh,
        (UiMode::Dashboard, K::Enter | K::Char('i')) => Open(Pane::Info),
        (UiMode::Dashboard, K::Char('l')) => Open(Pane::Logs),
        (UiMode::Dashboard, K::Char('e')) => Open(Pane::Shell),
        (UiMode::Dashboard, K::Char('s')) => Container(LifecycleOp::Start),
        (UiMode::Dashboard, K::Char('x')) => Container(LifecycleOp::Stop),
        (UiMode::Dashboard, K::Char('r')) => Container(LifecycleOp::Restart),
        (UiMode::Dashboard, K::Char('d') | K::Delete) => Container(LifecycleOp::Remove),
        (UiMode::Dashboard, K::Char('S')) => Project(LifecycleOp::Start),
        (UiMode::Dashboard, K::Char('X')) => Project(LifecycleOp::Stop),
        (UiMode::Dashboard, K::Char('R')) => Project(LifecycleOp::Restart),
        (UiMode::Dashboard, K::Char('D')) => Project(LifecycleOp::Remove),
        (UiMode::Dashboard, _) => return None,
    };
    Some(action)
}

/// Footer hint for a mode
pub fn hint(mode: UiMode) -> &'static str {
    match mode {
        UiMode::Dashboard => {
            "j/k: Move  Tab: Project  Enter: Info  l: Logs  e: Shell  s/x/r/d: Start/Stop/Restart/Delete  S/X/R/D: Project  ?: Help  q: Quit"
        }
        UiMode::Logs => "/: Filter  n/N: Next/Prev match  c: Clear  j/k PgUp/PgDn: Scroll  Tab: Pane  Esc: Back",
        UiMode::LogFilter => "Enter: Apply  Esc: Cancel",
        UiMode::Shell => "Enter: Run  Up/Down: History  PgUp/PgDn: Scroll  Tab: Pane  Esc: Back",
        UiMode::Info => "j/k: Scroll  Tab: Pane  Esc: Back",
        UiMode::Confirm => "y: Yes  n: No  Tab: Switch  Enter: Select",
        UiMode::Help => "Any key: Close",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_same_key_differs_by_mode() {
        let j = key(KeyCode::Char('j'));
        assert_eq!(action_for(UiMode::Dashboard, j), Some(Action::FocusNext));
        assert_eq!(action_for(UiMode::Logs, j), Some(Action::ScrollDown));
        assert_eq!(
            action_for(UiMode::Shell, j),
            Some(Action::Shell(ShellKey::Char('j')))
        );
        assert_eq!(
            action_for(UiMode::LogFilter, j),
            Some(Action::EditFilter(FilterEdit::Insert('j')))
        );
        assert_eq!(action_for(UiMode::Confirm, j), None);
        assert_eq!(action_for(UiMode::Help, j), Some(Action::Back));
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(action_for(UiMode::Dashboard, key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(action_for(UiMode::Logs, key(KeyCode::Char('q'))), Some(Action::Back));
        assert_eq!(action_for(UiMode::Logs, ctrl('c')), Some(Action::Quit));
        assert_eq!(
            action_for(UiMode::Shell, ctrl('c')),
            Some(Action::Shell(ShellKey::ClearLine))
        );
    }

    #[test]
    fn test_project_ops_are_uppercase() {
        assert_eq!(
            action_for(UiMode::Dashboard, key(KeyCode::Char('x'))),
            Some(Action::Container(LifecycleOp::Stop))
        );
        assert_eq!(
            action_for(UiMode::Dashboard, key(KeyCode::Char('X'))),
            Some(Action::Project(LifecycleOp::Stop))
        );
    }

    #[test]
    fn test_pane_cycle() {
        assert_eq!(Pane::Logs.next(), Pane::Shell);
        assert_eq!(Pane::Info.next(), Pane::Logs);
        assert_eq!(Pane::Shell.mode(), UiMode::Shell);
    }
}
