use super::*;

pub(super) fn draw_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let groups = app.reconciler.current_groups();

    if let Some(group) = groups.iter().find(|g| g.is_error()) {
        draw_error_group(frame, group, area);
        return;
    }

    if groups.is_empty() {
        let text = if app.reconciler.pass_count() == 0 {
            "Loading containers..."
        } else {
            "No containers found.\n\nStart something with 'docker run' or 'docker compose up'."
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title(" Containers ").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(" "),
        Cell::from("#"),
        Cell::from("Name"),
        Cell::from("Image"),
        Cell::from("Status"),
        Cell::from("Ports"),
        Cell::from("Created"),
    ])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .bottom_margin(1);

    let focused = app.reconciler.focused_id();
    let mut selected = None;
    let mut rows = Vec::new();
    for group in &groups {
        rows.push(group_row(group));
        for record in &group.containers {
            if Some(record.id.as_str()) == focused {
                selected = Some(rows.len());
            }
            let color = status_color(record.status_class);
            let symbol = if record.status_class.is_running() { "●" } else { "○" };
            rows.push(Row::new(vec![
                Cell::from(symbol).style(Style::default().fg(color)),
                Cell::from(record.display_index.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(record.name.clone()).style(Style::default().bold()),
                Cell::from(record.image.clone()),
                Cell::from(record.status_raw.clone()).style(Style::default().fg(color)),
                Cell::from(record.ports.clone()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(record.created_at.clone()).style(Style::default().fg(Color::DarkGray)),
            ]));
        }
    }

    let widths = [
        Constraint::Length(2),  // Status icon
        Constraint::Length(4),  // Index
        Constraint::Length(28), // Name, also the group label
        Constraint::Length(22), // Image
        Constraint::Length(22), // Status
        Constraint::Min(12),    // Ports
        Constraint::Length(16), // Created
    ];

    let title = match app.reconciler.active_group() {
        Some(group) => format!(" Containers: {} ", group),
        None => " Containers ".to_string(),
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn group_row(group: &ProjectGroup) -> Row<'static> {
    let style = if group.is_uncategorized() {
        Style::default().fg(Color::Gray).bold()
    } else {
        Style::default().fg(Color::Magenta).bold()
    };
    let label = format!(
        "{} ({}/{} running)",
        group.name,
        group.running(),
        group.containers.len()
    );
    Row::new(vec![Cell::from("▾"), Cell::from(""), Cell::from(label)]).style(style)
}

fn draw_error_group(frame: &mut Frame, group: &ProjectGroup, area: Rect) {
    let message = group.error.clone().unwrap_or_default();
    let text = vec![
        Line::styled(group.name.clone(), Style::default().fg(Color::Red).bold()),
        Line::from(""),
        Line::styled(message, Style::default().fg(Color::Red)),
        Line::from(""),
        Line::styled(
            "Retrying on the next refresh.",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(" Containers ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
