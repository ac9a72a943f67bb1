use super::*;

pub(super) fn draw_confirm_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let Some(action) = &app.confirm else {
        return;
    };
    let op = match action {
        ConfirmAction::Container { op, .. } | ConfirmAction::Project { op, .. } => *op,
    };
    let border = if op == LifecycleOp::Remove {
        Color::Red
    } else {
        Color::Yellow
    };
    let mut dialog = DialogBuilder::new(action.title())
        .width(56)
        .border_color(border)
        .empty_line()
        .message(action.prompt());
    if matches!(action, ConfirmAction::Project { .. }) {
        dialog = dialog.styled_message(Line::styled(
            "Applies to every container with this project label",
            Style::default().fg(Color::DarkGray),
        ));
    }
    dialog
        .empty_line()
        .buttons(app.dialog_focus)
        .empty_line()
        .help("y/n or Tab + Enter")
        .render(frame, area);
}

const HELP: &[(&str, &str)] = &[
    ("Dashboard", ""),
    ("j/k, Up/Down", "Move focus"),
    ("g/G", "First / last container"),
    ("Tab/Shift+Tab", "Show one project at a time"),
    ("Enter, i", "Container info"),
    ("l", "Logs"),
    ("e", "Shell"),
    ("s/x/r/d", "Start / stop / restart / delete container"),
    ("S/X/R/D", "Same for the whole Compose project"),
    ("F5", "Refresh now"),
    ("", ""),
    ("Logs", ""),
    ("/", "Filter (last lines only)"),
    ("n/N", "Next / previous match"),
    ("c", "Clear filter"),
    ("PgUp/PgDn", "Scroll"),
    ("", ""),
    ("Shell", ""),
    ("Enter", "Run command"),
    ("Up/Down", "History"),
    ("exit", "Close the session"),
    ("", ""),
    ("Tab", "Next pane"),
    ("Esc", "Back"),
    ("q, Ctrl+C", "Quit"),
];

pub(super) fn draw_help(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            if what.is_empty() {
                Line::styled(keys.to_string(), Style::default().fg(Color::Cyan).bold())
            } else {
                Line::from(vec![
                    Span::styled(format!("  {:<16}", keys), Style::default().fg(Color::Yellow)),
                    Span::raw(what.to_string()),
                ])
            }
        })
        .collect();

    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = centered_rect(64, height, area);
    frame.render_widget(Clear, popup);
    let help = Paragraph::new(lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(help, popup);
}
