//! "Chat" screen: drives one registration conversation against the local store.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use teamreg_core::ChatReply;
use uuid::Uuid;

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    Bot,
    You,
    Error,
}

pub(crate) struct ChatScreen {
    session_id: String,
    transcript: Vec<(Speaker, String)>,
    buttons: Vec<String>,
    selected_button: usize,
    input: String,
    editing: bool,
    state: &'static str,
}

impl ChatScreen {
    pub(crate) fn new(backend: &Backend) -> Self {
        let mut screen = Self::detached(new_session_id());
        // An empty message yields the current prompt.
        screen.exchange(backend, "");
        screen
    }

    fn detached(session_id: String) -> Self {
        Self {
            session_id,
            transcript: Vec::new(),
            buttons: Vec::new(),
            selected_button: 0,
            input: String::new(),
            editing: false,
            state: "WELCOME",
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(3),    // Transcript
                Constraint::Length(1), // Buttons
                Constraint::Length(3), // Input
                Constraint::Length(1), // Hint
            ])
            .split(area);

        let lines: Vec<Line> = self
            .transcript
            .iter()
            .flat_map(|(speaker, text)| {
                let (label, style) = match speaker {
                    Speaker::Bot => ("bot", Style::default().fg(Color::Cyan)),
                    Speaker::You => ("you", Style::default().fg(Color::Green)),
                    Speaker::Error => ("!", Style::default().fg(Color::Red)),
                };
                let mut out: Vec<Line> = text
                    .lines()
                    .enumerate()
                    .map(|(i, line)| {
                        let prefix = if i == 0 {
                            format!("{label:>4} │ ")
                        } else {
                            "     │ ".to_string()
                        };
                        Line::from(vec![Span::styled(prefix, style), Span::raw(line.to_string())])
                    })
                    .collect();
                out.push(Line::from(""));
                out
            })
            .collect();

        let inner_width = chunks[0].width.saturating_sub(2);
        let inner_height = chunks[0].height.saturating_sub(2);
        let total: u16 = lines
            .iter()
            .map(|l| wrapped_height(l.width(), inner_width))
            .sum();
        let scroll = total.saturating_sub(inner_height);

        let transcript = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} · {} ", self.session_id, self.state)),
            );
        f.render_widget(transcript, chunks[0]);

        let mut spans = Vec::new();
        for (i, label) in self.buttons.iter().enumerate() {
            let style = if i == self.selected_button && !self.editing {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            spans.push(Span::styled(format!(" {label} "), style));
            spans.push(Span::raw(" "));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);

        let input_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let input = Paragraph::new(self.input.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Message ")
                .border_style(input_style),
        );
        f.render_widget(input, chunks[2]);

        let hint = if self.editing {
            "Type a message · Enter to send · Esc to stop editing"
        } else {
            "i to type · ←/→ pick a button · Enter to send it · n new session"
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[3]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers, backend: &Backend) {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Enter => {
                    let message = std::mem::take(&mut self.input);
                    if !message.trim().is_empty() {
                        self.exchange(backend, &message);
                    }
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('i') => self.editing = true,
            KeyCode::Enter => match self.buttons.get(self.selected_button).cloned() {
                Some(label) => self.exchange(backend, &label),
                None => self.editing = true,
            },
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_button = self.selected_button.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_button + 1 < self.buttons.len() {
                    self.selected_button += 1;
                }
            }
            KeyCode::Char('n') => self.start_over(backend),
            _ => {}
        }
    }

    /// Delete the stored session and begin a fresh one.
    fn start_over(&mut self, backend: &Backend) {
        match backend.reset(&self.session_id) {
            Ok(_) => {
                *self = Self::detached(new_session_id());
                self.exchange(backend, "");
            }
            Err(e) => self.push(Speaker::Error, e.to_string()),
        }
    }

    fn exchange(&mut self, backend: &Backend, message: &str) {
        if !message.is_empty() {
            self.push(Speaker::You, message.to_string());
        }
        match backend.send(&self.session_id, message) {
            Ok(reply) => self.apply_reply(reply),
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "chat message failed");
                self.push(Speaker::Error, e.to_string());
            }
        }
    }

    fn apply_reply(&mut self, reply: ChatReply) {
        self.state = reply.state;
        self.buttons = reply.buttons.unwrap_or_default();
        self.selected_button = 0;
        self.push(Speaker::Bot, reply.message);
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        self.transcript.push((speaker, text));
    }
}

fn new_session_id() -> String {
    format!("tui-{}", Uuid::now_v7())
}

/// Rows a line of `width` columns occupies when wrapped to `area_width`.
fn wrapped_height(width: usize, area_width: u16) -> u16 {
    let area_width = usize::from(area_width.max(1));
    let rows = width.div_ceil(area_width).max(1);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use teamreg_core::Outcome;

    #[test]
    fn wrapped_height_counts_rows() {
        assert_eq!(wrapped_height(0, 40), 1);
        assert_eq!(wrapped_height(40, 40), 1);
        assert_eq!(wrapped_height(41, 40), 2);
        assert_eq!(wrapped_height(10, 0), 10);
    }

    #[test]
    fn reply_replaces_buttons_and_state() {
        let mut screen = ChatScreen::detached("s".into());
        screen.selected_button = 1;
        screen.apply_reply(ChatReply {
            message: "Which batch?".into(),
            buttons: Some(vec!["23".into(), "24".into()]),
            state: "BATCH_SELECTION",
            data: json!({}),
            outcome: Outcome::Accepted,
        });

        assert_eq!(screen.state, "BATCH_SELECTION");
        assert_eq!(screen.buttons, vec!["23", "24"]);
        assert_eq!(screen.selected_button, 0);
        assert_eq!(screen.transcript.last().map(|(s, _)| *s), Some(Speaker::Bot));
    }
}
