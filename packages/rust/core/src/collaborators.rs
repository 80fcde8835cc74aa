//! Seams between the engine and the outside world.
//!
//! The engine only talks to a [`RegistrationStore`], a [`Notifier`] and a
//! [`RosterSync`]. The concrete adapters live in `teamreg-storage` and
//! `teamreg-delivery`; disabled collaborators are replaced by the log-only
//! implementations below.

use async_trait::async_trait;
use teamreg_delivery::{HttpRosterSync, SmtpNotifier};
use teamreg_shared::{DeliveryRecord, Registration, Result};
use teamreg_storage::{DeliveryFilter, RegistrationFilter, Storage};

/// Persistence for registration documents and the delivery log.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Registration>>;

    /// Check-and-set on `registration.version`. Fails with `Conflict` when a
    /// team name, index number or e-mail belongs to another registration,
    /// and with `StaleWrite` when the stored version moved on.
    async fn save(&self, registration: &Registration) -> Result<Registration>;

    async fn delete(&self, session_id: &str) -> Result<bool>;

    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<Registration>>;

    async fn state_counts(&self) -> Result<Vec<(String, u64)>>;

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()>;

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>>;
}

/// Sends the confirmation once a registration reaches `DONE`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_registration_confirmation(&self, registration: &Registration) -> Result<()>;
}

/// Keeps the roster spreadsheet in step with completed registrations.
/// Rows are keyed by team name.
#[async_trait]
pub trait RosterSync: Send + Sync {
    async fn append_team_row(&self, registration: &Registration) -> Result<()>;
    async fn update_team_row(&self, registration: &Registration) -> Result<()>;
    async fn remove_team_row(&self, registration: &Registration) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Concrete adapters
// ---------------------------------------------------------------------------

#[async_trait]
impl RegistrationStore for Storage {
    async fn load(&self, session_id: &str) -> Result<Option<Registration>> {
        self.load_registration(session_id).await
    }

    async fn save(&self, registration: &Registration) -> Result<Registration> {
        self.save_registration(registration).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.delete_registration(session_id).await
    }

    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<Registration>> {
        self.list_registrations(filter).await
    }

    async fn state_counts(&self) -> Result<Vec<(String, u64)>> {
        Storage::state_counts(self).await
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        Storage::record_delivery(self, record).await
    }

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>> {
        Storage::list_deliveries(self, filter).await
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_registration_confirmation(&self, registration: &Registration) -> Result<()> {
        self.send_confirmation(registration).await
    }
}

#[async_trait]
impl RosterSync for HttpRosterSync {
    async fn append_team_row(&self, registration: &Registration) -> Result<()> {
        self.append(registration).await
    }

    async fn update_team_row(&self, registration: &Registration) -> Result<()> {
        self.update(registration).await
    }

    async fn remove_team_row(&self, registration: &Registration) -> Result<()> {
        self.remove(registration).await
    }
}

// ---------------------------------------------------------------------------
// Log-only fallbacks
// ---------------------------------------------------------------------------

/// Used when `[smtp] enabled = false`.
pub struct LogOnlyNotifier;

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn send_registration_confirmation(&self, registration: &Registration) -> Result<()> {
        tracing::info!(
            session_id = %registration.session_id,
            team = registration.team_name.as_deref().unwrap_or_default(),
            "email disabled, confirmation not sent"
        );
        Ok(())
    }
}

/// Used when `[roster] enabled = false`.
pub struct LogOnlyRoster;

#[async_trait]
impl RosterSync for LogOnlyRoster {
    async fn append_team_row(&self, registration: &Registration) -> Result<()> {
        log_roster("append", registration);
        Ok(())
    }

    async fn update_team_row(&self, registration: &Registration) -> Result<()> {
        log_roster("update", registration);
        Ok(())
    }

    async fn remove_team_row(&self, registration: &Registration) -> Result<()> {
        log_roster("remove", registration);
        Ok(())
    }
}

fn log_roster(action: &str, registration: &Registration) {
    tracing::info!(
        action,
        team = registration.team_name.as_deref().unwrap_or_default(),
        "roster sync disabled, row not sent"
    );
}
