//! Outbound adapters for completed registrations.
//!
//! - [`SmtpNotifier`] sends the confirmation e-mail to every member
//! - [`HttpRosterSync`] mirrors registrations into the roster spreadsheet
//!
//! Both are best-effort: callers log and record failures, they never undo a
//! committed registration.

pub mod email;
pub mod roster;

pub use email::{SmtpNotifier, build_confirmation};
pub use roster::{HttpRosterSync, RosterAction, roster_row};
