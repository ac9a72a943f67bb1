use super::*;
use dockman_core::session::ShellLine;

pub(super) fn draw_shell(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(key) = app.shell_session_key() else {
        return;
    };
    let Some(session) = app.sessions.shell_session_mut(&key) else {
        draw_placeholder(frame, area, " Shell ", "No shell session open.");
        return;
    };

    let unavailable = match session.state() {
        ShellState::Unavailable(reason) => Some(reason.clone()),
        _ => None,
    };
    let (term_area, notice_area) = match unavailable {
        Some(_) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(area);
            (chunks[0], Some(chunks[1]))
        }
        None => (area, None),
    };

    let inner_height = term_area.height.saturating_sub(2) as usize;
    let total = session.len();
    session.viewport.set_height(inner_height, total);
    let offset = session.viewport.offset();
    let range = session.viewport.visible(total);

    let rendered = session.render_lines();
    let lines: Vec<Line> = range
        .clone()
        .filter_map(|i| rendered.get(i))
        .map(|text| ansi_line(text))
        .collect();

    let border = match session.state() {
        ShellState::Connected => Color::Green,
        ShellState::Connecting => Color::Yellow,
        ShellState::Disconnected => Color::DarkGray,
        ShellState::Unavailable(_) => Color::Red,
    };
    let shell_name = session.shell().unwrap_or("-");
    let mut title = format!(" Shell: {} [{}] {} ", session.name(), shell_name, session.state());
    if session.is_full_screen() {
        title.push_str("(full screen) ");
    }

    // Cursor on the prompt line when it is the last visible line
    let prompt_visible = session.is_connected()
        && session.lines().last() == Some(&ShellLine::Prompt)
        && range.end == total
        && !range.is_empty();
    let cursor = prompt_visible.then(|| {
        let prompt_width = Line::raw(session.prompt_text().plain).width();
        let row = (range.len() - 1) as u16;
        (prompt_width + session.editor().cursor(), row)
    });

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, term_area);
    draw_scrollbar(frame, term_area, total, inner_height, offset);

    if let Some((col, row)) = cursor {
        let x = term_area.x + 1 + col as u16;
        let y = term_area.y + 1 + row;
        frame.set_cursor(x.min(term_area.right().saturating_sub(2)), y);
    }

    if let (Some(reason), Some(notice)) = (unavailable, notice_area) {
        let line = Line::styled(
            format!(" No shell available: {}", reason),
            Style::default().fg(Color::Red),
        );
        frame.render_widget(Paragraph::new(line), notice);
    }
}
