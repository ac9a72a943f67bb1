//! Modal dialog builder

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Which button of a yes/no dialog has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogFocus {
    Confirm,
    #[default]
    Cancel,
}

impl DialogFocus {
    pub fn toggle(self) -> Self {
        match self {
            Self::Confirm => Self::Cancel,
            Self::Cancel => Self::Confirm,
        }
    }
}

/// Builds a bordered dialog centred over the frame
pub struct DialogBuilder<'a> {
    title: &'a str,
    lines: Vec<Line<'a>>,
    width: u16,
    border_color: Color,
}

impl<'a> DialogBuilder<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            lines: Vec::new(),
            width: 50,
            border_color: Color::Yellow,
        }
    }

    pub fn width(mut self, w: u16) -> Self {
        self.width = w;
        self
    }

    pub fn border_color(mut self, color: Color) -> Self {
        self.border_color = color;
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::from(text.into()));
        self
    }

    pub fn styled_message(mut self, line: Line<'a>) -> Self {
        self.lines.push(line);
        self
    }

    pub fn empty_line(mut self) -> Self {
        self.lines.push(Line::from(""));
        self
    }

    /// Yes/No buttons, the focused one inverted
    pub fn buttons(mut self, focus: DialogFocus) -> Self {
        let yes = if focus == DialogFocus::Confirm {
            Style::default().bg(Color::Green).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::Green)
        };
        let no = if focus == DialogFocus::Cancel {
            Style::default().bg(Color::Red).fg(Color::White).bold()
        } else {
            Style::default().fg(Color::Red)
        };
        self.lines.push(Line::from(vec![
            Span::styled("  Yes  ", yes),
            Span::raw("    "),
            Span::styled("  No  ", no),
        ]));
        self
    }

    pub fn help(mut self, text: &'a str) -> Self {
        self.lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(Color::DarkGray),
        )));
        self
    }

    pub fn render(self, frame: &mut Frame, area: Rect) {
        // +2 for borders
        let height = (self.lines.len() as u16) + 2;
        let dialog_area = centered_rect(self.width, height, area);

        frame.render_widget(Clear, dialog_area);
        let dialog = Paragraph::new(self.lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(format!(" {} ", self.title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.border_color)),
            );
        frame.render_widget(dialog, dialog_area);
    }
}

/// A `width` x `height` rectangle centred in `area`, clamped to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
