use super::*;
use dockman_core::format_ports;
use dockman_provider::ContainerDetails;

pub(super) fn draw_info(frame: &mut Frame, app: &App, area: Rect) {
    let (lines, border) = match &app.info {
        Some(InfoState::Loaded(details)) => (detail_lines(details), Color::Cyan),
        Some(InfoState::Failed(error)) => (
            vec![Line::styled(
                format!("Inspect failed: {}", error),
                Style::default().fg(Color::Red),
            )],
            Color::Red,
        ),
        None => (vec![Line::raw("Loading...")], Color::DarkGray),
    };
    let name = app.target.as_ref().map(|t| t.name.as_str()).unwrap_or("");
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" Info: {} ", name))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.info_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::Cyan)),
        Span::raw(value.into()),
    ])
}

fn section(title: &str) -> Line<'static> {
    Line::styled(title.to_string(), Style::default().bold())
}

fn detail_lines(details: &ContainerDetails) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("ID", details.id.to_string()),
        field("Name", details.name.clone()),
        field("Image", details.image.clone()),
        field("State", details.state.to_string()),
    ];
    if let Some(code) = details.exit_code {
        lines.push(field("Exit code", code.to_string()));
    }
    if let Some(restarts) = details.restart_count {
        lines.push(field("Restarts", restarts.to_string()));
    }
    if let Some(ip) = &details.ip_address {
        lines.push(field("IP", ip.clone()));
    }
    if !details.ports.is_empty() {
        lines.push(field("Ports", format_ports(&details.ports)));
    }

    if !details.mounts.is_empty() {
        lines.push(Line::raw(""));
        lines.push(section("Mounts"));
        for mount in &details.mounts {
            let mode = if mount.read_only { "ro" } else { "rw" };
            lines.push(Line::raw(format!(
                "  {} {} -> {} ({})",
                mount.mount_type, mount.source, mount.destination, mode
            )));
        }
    }

    if !details.labels.is_empty() {
        lines.push(Line::raw(""));
        lines.push(section("Labels"));
        let mut labels: Vec<_> = details.labels.iter().collect();
        labels.sort();
        for (key, value) in labels {
            lines.push(Line::raw(format!("  {}={}", key, value)));
        }
    }

    if !details.env.is_empty() {
        lines.push(Line::raw(""));
        lines.push(section("Environment"));
        for var in &details.env {
            lines.push(Line::raw(format!("  {}", var)));
        }
    }
    lines
}
