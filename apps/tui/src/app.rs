//! TUI application state and event loop.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};

use crate::backend::Backend;
use crate::screens::{Screen, ScreenId};
use crate::widgets::status_bar;

const TABS: [ScreenId; 2] = [ScreenId::Chat, ScreenId::Registrations];

const HELP: &[(&str, &str)] = &[
    ("1 / 2", "Chat / Registrations"),
    ("Tab, S-Tab", "Cycle tabs"),
    ("?", "Toggle this help"),
    ("q, Ctrl-C", "Quit"),
    ("", ""),
    ("i", "Chat: type a message, Esc to stop"),
    ("← → Enter", "Chat: pick and send a button"),
    ("n", "Chat: new session"),
    ("", ""),
    ("↑ ↓", "Registrations: move selection"),
    ("r", "Registrations: refresh"),
    ("s", "Registrations: cycle state filter"),
    ("d then y", "Registrations: delete selected"),
];

pub(crate) struct App {
    active: usize,
    screens: Vec<Screen>,
    status: String,
    event_name: String,
    show_help: bool,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(backend: &Backend) -> Self {
        Self {
            active: 0,
            screens: TABS.iter().map(|id| Screen::new(*id, backend)).collect(),
            status: "Ready · press ? for help".to_string(),
            event_name: backend.event_name().to_string(),
            show_help: false,
            should_quit: false,
        }
    }

    fn screen(&self) -> &Screen {
        &self.screens[self.active]
    }

    fn select(&mut self, idx: usize, backend: &Backend) {
        self.active = idx;
        self.status = TABS[idx].to_string();
        self.screens[idx].on_focus(backend);
    }

    fn cycle(&mut self, forward: bool, backend: &Backend) {
        let n = TABS.len();
        let idx = if forward {
            (self.active + 1) % n
        } else {
            (self.active + n - 1) % n
        };
        self.select(idx, backend);
    }

    fn on_key(&mut self, code: KeyCode, modifiers: KeyModifiers, backend: &Backend) {
        if modifiers.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c' | 'q')) {
            self.should_quit = true;
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }

        // Text input swallows everything else.
        if self.screen().is_editing() {
            self.screens[self.active].handle_key(code, modifiers, backend);
            return;
        }

        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                if idx < TABS.len() {
                    self.select(idx, backend);
                }
            }
            KeyCode::Tab => self.cycle(true, backend),
            KeyCode::BackTab => self.cycle(false, backend),
            _ => self.screens[self.active].handle_key(code, modifiers, backend),
        }
    }

    fn draw(&self, f: &mut Frame) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(f.area());

        let titles = TABS
            .iter()
            .enumerate()
            .map(|(i, id)| Line::from(format!("{} {id}", i + 1)));
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title(" teamreg "))
            .select(self.active)
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .divider(" │ ");
        f.render_widget(tabs, header);

        self.screen().draw(f, body);
        f.render_widget(status_bar(&self.event_name, &self.status), footer);

        if self.show_help {
            draw_help(f);
        }
    }
}

/// Open the store, take over the terminal, run until quit, then hand it back.
pub(crate) fn run() -> Result<()> {
    // Before raw mode, so config and database errors print normally.
    let backend = Backend::open()?;

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = event_loop(&mut terminal, &backend);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    backend.shutdown();
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, backend: &Backend) -> Result<()> {
    let mut app = App::new(backend);
    while !app.should_quit {
        terminal.draw(|f| app.draw(f))?;
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            // Windows reports releases too.
            if key.kind == KeyEventKind::Press {
                app.on_key(key.code, key.modifiers, backend);
            }
        }
    }
    Ok(())
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(56, 60, f.area());
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("  {keys:<12}"), key_style),
                Span::raw(*what),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keys · any key closes "),
    );
    f.render_widget(Clear, area);
    f.render_widget(help.style(Style::default().bg(Color::DarkGray)), area);
}

/// A rectangle of the given percentage size centred in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);
    let [_, centre, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    centre
}
