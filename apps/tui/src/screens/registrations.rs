//! "Registrations" screen: lists stored registrations, inspects and deletes them.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use teamreg_shared::{Registration, RegistrationState, TEAM_SIZE};

use crate::backend::Backend;

/// Filter cycle for the `s` key.
const STATE_FILTERS: [Option<&str>; 6] = [
    None,
    Some("WELCOME"),
    Some("BATCH_SELECTION"),
    Some("MEMBER_DETAILS"),
    Some("CONFIRMATION"),
    Some("DONE"),
];

pub(crate) struct RegistrationsScreen {
    entries: Vec<Registration>,
    selected: usize,
    filter: usize,
    confirm_delete: bool,
    status: String,
}

impl RegistrationsScreen {
    pub(crate) fn new(backend: &Backend) -> Self {
        let mut screen = Self {
            entries: Vec::new(),
            selected: 0,
            filter: 0,
            confirm_delete: false,
            status: String::new(),
        };
        screen.refresh(backend);
        screen
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(1),    // List + detail
                Constraint::Length(1), // Status
            ])
            .split(area);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[0]);

        let filter = STATE_FILTERS[self.filter].unwrap_or("all");
        let title = format!(" Registrations: {filter} ({}) ", self.entries.len());

        if self.entries.is_empty() {
            let empty = Paragraph::new(
                "No registrations yet.\n\nStart one from the 'Chat' tab, \
                 or press 's' to change the state filter.",
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(empty, panes[0]);
        } else {
            let items: Vec<ListItem> = self
                .entries
                .iter()
                .enumerate()
                .map(|(i, reg)| {
                    let style = if i == self.selected {
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    let prefix = if i == self.selected { "▸ " } else { "  " };
                    ListItem::new(format!("{prefix}{}", row_label(reg))).style(style)
                })
                .collect();

            let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(list, panes[0]);
        }

        let detail = self
            .entries
            .get(self.selected)
            .map(detail_lines)
            .unwrap_or_default();
        let detail = Paragraph::new(detail)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Details "));
        f.render_widget(detail, panes[1]);

        let (text, style) = if self.confirm_delete {
            (
                "Delete this registration? y to confirm, any other key to cancel".to_string(),
                Style::default().fg(Color::Yellow),
            )
        } else {
            (self.status.clone(), Style::default().fg(Color::DarkGray))
        };
        let status = Paragraph::new(text).style(style).alignment(Alignment::Center);
        f.render_widget(status, chunks[1]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers, backend: &Backend) {
        if self.confirm_delete {
            self.confirm_delete = false;
            if code == KeyCode::Char('y') {
                self.delete_selected(backend);
            } else {
                self.status = "Delete cancelled.".to_string();
            }
            return;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.entries.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('r') => self.refresh(backend),
            KeyCode::Char('s') => {
                self.filter = (self.filter + 1) % STATE_FILTERS.len();
                self.refresh(backend);
            }
            KeyCode::Char('d') | KeyCode::Delete if !self.entries.is_empty() => {
                self.confirm_delete = true;
            }
            _ => {}
        }
    }

    pub(crate) fn refresh(&mut self, backend: &Backend) {
        match backend.registrations(STATE_FILTERS[self.filter]) {
            Ok(entries) => {
                self.entries = entries;
                self.selected = self.selected.min(self.entries.len().saturating_sub(1));
                self.status = format!(
                    "{} registration(s) · r refresh · s filter · d delete",
                    self.entries.len()
                );
            }
            Err(e) => self.status = format!("Failed to load registrations: {e}"),
        }
    }

    fn delete_selected(&mut self, backend: &Backend) {
        let Some(session_id) = self.entries.get(self.selected).map(|r| r.session_id.clone())
        else {
            return;
        };
        match backend.delete(&session_id) {
            Ok(deleted) => {
                self.refresh(backend);
                self.status = format!("Deleted {}.", row_label(&deleted));
            }
            Err(e) => self.status = format!("Delete failed: {e}"),
        }
    }
}

fn row_label(reg: &Registration) -> String {
    format!(
        "{}  [{}]  {}/{}  {}",
        reg.team_name.as_deref().unwrap_or("(unnamed)"),
        reg.team_batch.as_deref().unwrap_or("--"),
        reg.members.len(),
        TEAM_SIZE,
        reg.state
    )
}

fn detail_lines(reg: &Registration) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![Span::styled("Session  ", bold), Span::raw(reg.session_id.clone())]),
        Line::from(vec![
            Span::styled("Team     ", bold),
            Span::raw(reg.team_name.clone().unwrap_or_default()),
        ]),
        Line::from(vec![
            Span::styled("Batch    ", bold),
            Span::raw(reg.team_batch.clone().unwrap_or_default()),
        ]),
        Line::from(vec![Span::styled("State    ", bold), Span::raw(state_detail(&reg.state))]),
        Line::from(vec![
            Span::styled("Updated  ", bold),
            Span::raw(reg.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]),
        Line::from(""),
    ];

    for (i, member) in reg.members.iter().enumerate() {
        lines.push(Line::styled(format!("Member {}", i + 1), bold));
        lines.push(Line::from(format!("  {}", member.full_name)));
        lines.push(Line::from(format!("  {} · {}", member.index_number, member.email)));
    }
    lines
}

fn state_detail(state: &RegistrationState) -> String {
    match state {
        RegistrationState::MemberDetails {
            member_number,
            pending,
            ..
        } => format!("{state} (member {member_number}, awaiting {})", pending.label()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamreg_shared::{Member, MemberField};

    #[test]
    fn row_label_shows_progress() {
        let mut reg = Registration::new("s1");
        assert_eq!(row_label(&reg), "(unnamed)  [--]  0/4  WELCOME");

        reg.team_name = Some("Phoenix".into());
        reg.team_batch = Some("23".into());
        reg.members.push(Member {
            full_name: "Ann Perera".into(),
            index_number: "230001A".into(),
            batch: "23".into(),
            email: "ann@example.com".into(),
        });
        reg.state = RegistrationState::MemberDetails {
            member_number: 2,
            pending: MemberField::Email,
            staged: Default::default(),
        };
        assert_eq!(row_label(&reg), "Phoenix  [23]  1/4  MEMBER_DETAILS");
        assert!(state_detail(&reg.state).contains("member 2"));
        assert_eq!(detail_lines(&reg).len(), 6 + 3);
    }
}
