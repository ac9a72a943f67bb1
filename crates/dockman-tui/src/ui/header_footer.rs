use super::*;

pub(super) fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" dockman - Docker Dashboard ")
        .title_style(Style::default().fg(Color::Cyan).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    match &app.target {
        Some(target) => {
            let titles: Vec<Line> = Pane::all()
                .iter()
                .map(|pane| {
                    if *pane == app.pane {
                        Line::styled(pane.label(), Style::default().fg(Color::White).bold())
                    } else {
                        Line::styled(pane.label(), Style::default().fg(Color::Gray))
                    }
                })
                .collect();
            let selected = Pane::all().iter().position(|p| *p == app.pane).unwrap_or(0);
            let tabs = Tabs::new(titles)
                .block(block.title(Line::from(format!(" {} ", target.name)).alignment(Alignment::Right)))
                .select(selected)
                .highlight_style(Style::default())
                .divider(" │ ");
            frame.render_widget(tabs, area);
        }
        None => {
            let summary = dashboard_summary(app);
            frame.render_widget(Paragraph::new(summary).block(block), area);
        }
    }
}

fn dashboard_summary(app: &App) -> Line<'static> {
    if let Some(error) = app.reconciler.error() {
        return Line::from(vec![
            Span::styled(" Runtime unreachable: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]);
    }
    let groups = app.reconciler.current_groups();
    let total: usize = groups.iter().map(|g| g.containers.len()).sum();
    let running: usize = groups.iter().map(|g| g.running()).sum();
    let projects = app.reconciler.project_names().len();

    let mut spans = vec![
        Span::raw(format!(" {} containers", total)),
        Span::raw("  "),
        Span::styled(format!("{} running", running), Style::default().fg(Color::Green)),
        Span::raw(format!("  {} projects", projects)),
    ];
    if let Some(group) = app.reconciler.active_group() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(
            format!("showing {}", group),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

pub(super) fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match (&app.status_message, app.busy_label()) {
        (Some(message), _) => (message.clone(), Style::default().fg(Color::Yellow)),
        (None, Some(busy)) => (busy.to_string(), Style::default().fg(Color::Cyan)),
        (None, None) => (footer_hint(app), Style::default().fg(Color::DarkGray)),
    };
    let footer = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

/// Key hints, narrowed to what applies to the focused container
pub(super) fn footer_hint(app: &App) -> String {
    if app.mode != UiMode::Dashboard {
        return keymap::hint(app.mode).to_string();
    }
    let Some(record) = app.reconciler.focused() else {
        return "F5: Refresh  ?: Help  q: Quit".to_string();
    };

    let mut keys = vec!["j/k: Move", "Tab: Project", "Enter: Info", "l: Logs"];
    match record.status_class {
        StatusClass::Running => keys.extend(["e: Shell", "x: Stop", "r: Restart"]),
        StatusClass::Restarting | StatusClass::Paused => keys.extend(["x: Stop", "r: Restart"]),
        _ => keys.push("s: Start"),
    }
    keys.push("d: Delete");
    if record.project.is_some() {
        keys.push("S/X/R/D: Project");
    }
    keys.extend(["?: Help", "q: Quit"]);
    keys.join("  ")
}
