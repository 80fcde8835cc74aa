//! TUI screen definitions.
//!
//! Each screen corresponds to a tab in the TUI and encapsulates its
//! own state and rendering logic.

mod chat;
mod registrations;

use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;

use crate::backend::Backend;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Chat,
    Registrations,
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "Chat"),
            Self::Registrations => write!(f, "Registrations"),
        }
    }
}

/// Per-screen state and behaviour.
pub(crate) enum Screen {
    Chat(chat::ChatScreen),
    Registrations(registrations::RegistrationsScreen),
}

impl Screen {
    pub(crate) fn new(id: ScreenId, backend: &Backend) -> Self {
        match id {
            ScreenId::Chat => Self::Chat(chat::ChatScreen::new(backend)),
            ScreenId::Registrations => {
                Self::Registrations(registrations::RegistrationsScreen::new(backend))
            }
        }
    }

    /// Whether the current screen has an active text input field.
    pub(crate) fn is_editing(&self) -> bool {
        match self {
            Self::Chat(chat) => chat.is_editing(),
            Self::Registrations(_) => false,
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        match self {
            Self::Chat(chat) => chat.draw(f, area),
            Self::Registrations(list) => list.draw(f, area),
        }
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers, backend: &Backend) {
        match self {
            Self::Chat(chat) => chat.handle_key(code, modifiers, backend),
            Self::Registrations(list) => list.handle_key(code, modifiers, backend),
        }
    }

    /// Called when the tab becomes active.
    pub(crate) fn on_focus(&mut self, backend: &Backend) {
        if let Self::Registrations(list) = self {
            list.refresh(backend);
        }
    }
}
