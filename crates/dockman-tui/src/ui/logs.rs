use super::*;
use dockman_core::session::LogSession;

pub(super) fn draw_logs(frame: &mut Frame, app: &mut App, area: Rect) {
    let editing = app.mode == UiMode::LogFilter;
    let Some(key) = app.log_session_key() else {
        return;
    };
    let Some(session) = app.sessions.log_session_mut(&key) else {
        draw_placeholder(frame, area, " Logs ", "No log session open.");
        return;
    };

    let show_filter = editing || !session.filter().is_empty();
    let (log_area, filter_area) = if show_filter {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let inner_height = log_area.height.saturating_sub(2) as usize;
    let total = session.len();
    session.viewport.set_height(inner_height, total);
    let offset = session.viewport.offset();
    let range = session.viewport.visible(total);
    let session: &LogSession = session;

    let lines: Vec<Line> = range.clone().map(|i| log_line(session, i)).collect();
    let (state, border) = match session.state() {
        StreamState::Streaming => ("following", Color::Green),
        StreamState::Ended => ("ended", Color::DarkGray),
        StreamState::Failed(_) => ("failed", Color::Red),
    };
    let title = format!(
        " Logs: {} [{}/{}] {} ",
        session.name(),
        range.end,
        total,
        state
    );
    let match_count = session.match_count();
    let current = session.current_match();
    let filter = session.filter().to_string();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, log_area);
    draw_scrollbar(frame, log_area, total, inner_height, offset);

    if let Some(bar) = filter_area {
        draw_filter_bar(frame, app, bar, &filter, editing, match_count, current);
    }
}

fn severity_style(severity: Option<Severity>) -> Style {
    match severity {
        Some(Severity::Error) => Style::default().fg(Color::Red),
        Some(Severity::Warning) => Style::default().fg(Color::Yellow),
        Some(Severity::Debug) => Style::default().fg(Color::DarkGray),
        Some(Severity::Info) | None => Style::default(),
    }
}

/// One buffer line with its severity colour and filter highlights
fn log_line(session: &LogSession, index: usize) -> Line<'static> {
    let Some(text) = session.line(index) else {
        return Line::default();
    };
    let base = severity_style(Severity::classify(text));
    let matches: Vec<_> = session.matches_on_line(index).collect();
    if matches.is_empty() {
        if text.contains('\x1b') {
            return ansi_line(text);
        }
        return Line::styled(text.to_string(), base);
    }

    let mut spans = Vec::new();
    let mut pos = 0;
    for (m, is_current) in matches {
        if let Some(before) = text.get(pos..m.start) {
            if !before.is_empty() {
                spans.push(Span::styled(before.to_string(), base));
            }
        }
        let style = if is_current {
            base.add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            base.add_modifier(Modifier::UNDERLINED)
        };
        if let Some(hit) = text.get(m.start..m.end) {
            spans.push(Span::styled(hit.to_string(), style));
        }
        pos = m.end;
    }
    if let Some(rest) = text.get(pos..) {
        if !rest.is_empty() {
            spans.push(Span::styled(rest.to_string(), base));
        }
    }
    Line::from(spans)
}

fn draw_filter_bar(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    filter: &str,
    editing: bool,
    match_count: usize,
    current: Option<usize>,
) {
    let counter = match (match_count, current) {
        (0, _) => " no matches".to_string(),
        (n, Some(c)) => format!(" {}/{}", c + 1, n),
        (n, None) => format!(" {} matches", n),
    };
    let prefix_style = if editing {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let line = Line::from(vec![
        Span::styled("/", prefix_style),
        Span::raw(if editing { app.filter_input.value() } else { filter }.to_string()),
        Span::styled(counter, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if editing {
        let x = area.x + 1 + Line::raw(app.filter_input.before_cursor()).width() as u16;
        frame.set_cursor(x.min(area.right().saturating_sub(1)), area.y);
    }
}

pub(super) fn draw_placeholder(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
