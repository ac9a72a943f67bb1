//! Rendering
//!
//! Everything here reads the reconciler and session buffers each frame;
//! the only state written back is the viewport height of the visible pane.

mod dashboard;
mod dialogs;
mod header_footer;
mod info;
mod logs;
mod shell;

use crate::app::{App, ConfirmAction, InfoState};
use crate::keymap::{self, LifecycleOp, Pane, UiMode};
use crate::widgets::{centered_rect, DialogBuilder};
use ansi_to_tui::IntoText;
use dockman_core::session::{Severity, ShellState, StreamState};
use dockman_core::{ProjectGroup, StatusClass};
use ratatui::{
    prelude::*,
    widgets::{
        Block, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, TableState, Tabs, Wrap,
    },
};

use dashboard::*;
use dialogs::*;
use header_footer::*;
use info::*;
use logs::*;
use shell::*;

/// Draw one frame
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, app, chunks[0]);

    if app.target.is_some() {
        match app.pane {
            Pane::Logs => draw_logs(frame, app, chunks[1]),
            Pane::Shell => draw_shell(frame, app, chunks[1]),
            Pane::Info => draw_info(frame, app, chunks[1]),
        }
    } else {
        draw_dashboard(frame, app, chunks[1]);
    }

    match app.mode {
        UiMode::Confirm => draw_confirm_dialog(frame, app, chunks[1]),
        UiMode::Help => draw_help(frame, chunks[1]),
        _ => {}
    }

    draw_footer(frame, app, chunks[2]);
}

/// Colour used for a status class everywhere
fn status_color(class: StatusClass) -> Color {
    match class {
        StatusClass::Running => Color::Green,
        StatusClass::Exited => Color::DarkGray,
        StatusClass::Restarting => Color::Yellow,
        StatusClass::Paused => Color::Blue,
        StatusClass::Dead => Color::Red,
        StatusClass::Other => Color::Gray,
    }
}

/// Parse SGR-carrying text into a line, falling back to the raw text
fn ansi_line(text: &str) -> Line<'static> {
    match text.into_text() {
        Ok(parsed) => parsed.lines.into_iter().next().unwrap_or_default(),
        Err(_) => Line::raw(text.to_string()),
    }
}

/// Vertical scrollbar along the right border of `area`
fn draw_scrollbar(frame: &mut Frame, area: Rect, total: usize, visible: usize, offset: usize) {
    if total <= visible {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"));
    let mut state = ScrollbarState::new(total.saturating_sub(visible)).position(offset);
    let bar_area = Rect {
        x: area.x + area.width.saturating_sub(1),
        y: area.y + 1,
        width: 1,
        height: area.height.saturating_sub(2),
    };
    frame.render_stateful_widget(scrollbar, bar_area, &mut state);
}
