//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// One rendered entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Entry {
    User(String),
    Bot(String),
    Error(String),
    Notice(String),
}

impl Entry {
    fn label(&self) -> Span<'static> {
        match self {
            Self::User(_) => Span::styled(
                "You: ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Self::Bot(_) => Span::styled(
                "Bot: ",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Self::Error(_) => Span::styled("Error: ", Style::default().fg(Color::Red)),
            Self::Notice(_) => Span::raw(""),
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::User(t) | Self::Bot(t) | Self::Error(t) | Self::Notice(t) => t,
        }
    }
}

/// Transcript lines, one blank line between entries.
pub(crate) fn transcript_lines(entries: &[Entry]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for entry in entries {
        let style = match entry {
            Entry::Notice(_) => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        let mut parts = entry.text().lines();
        let first = parts.next().unwrap_or_default();
        lines.push(Line::from(vec![entry.label(), Span::styled(first, style)]));
        lines.extend(parts.map(|p| Line::styled(p, style)));
        lines.push(Line::from(""));
    }
    lines
}

/// Rows the lines take when wrapped to `width` columns.
pub(crate) fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}"))
        .style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White),
        )
}

/// Create a centered rectangle with percentage width and height.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
