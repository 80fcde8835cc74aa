//! Conversation engine and back-office logic for team registration.
//!
//! This crate ties the intake rules, the store and the delivery adapters
//! together:
//! - [`RegistrationEngine`] handles chat messages
//! - [`Admin`] lists, edits, deletes and resyncs stored registrations
//! - [`collaborators`] defines the store / notifier / roster seams

pub mod admin;
pub mod collaborators;
pub mod engine;
pub mod faq;
pub mod locks;
pub mod machine;
pub mod reply;
pub mod retry;
pub mod services;

#[cfg(test)]
mod testing;

pub use admin::{Admin, ResyncProgress, ResyncSummary, SilentProgress};
pub use collaborators::{
    LogOnlyNotifier, LogOnlyRoster, Notifier, RegistrationStore, RosterSync,
};
pub use engine::{EngineSettings, RegistrationEngine, is_reset_command};
pub use faq::FaqResponder;
pub use machine::{IntakePolicy, Rejection};
pub use reply::{ChatReply, Outcome};
pub use services::Services;
