//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Bottom status bar: the event name, then the current message.
pub(crate) fn status_bar<'a>(event_name: &'a str, msg: &'a str) -> Paragraph<'a> {
    let line = Line::from(vec![
        Span::styled(
            format!(" {event_name} "),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(format!(" {msg}")),
    ]);
    Paragraph::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White))
}
