//! Test doubles for the engine's collaborators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use teamreg_shared::{DeliveryRecord, Registration, Result, TeamRegError};
use teamreg_storage::{DeliveryFilter, RegistrationFilter, Storage};
use uuid::Uuid;

use crate::collaborators::{Notifier, RegistrationStore, RosterSync};

/// Create a temp file storage for testing.
pub(crate) async fn temp_storage() -> Storage {
    let tmp = std::env::temp_dir().join(format!("tr_core_test_{}.db", Uuid::now_v7()));
    Storage::open(&tmp).await.expect("open test db")
}

fn team(registration: &Registration) -> String {
    registration.team_name.clone().unwrap_or_default()
}

/// Records the team name of every confirmation it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_registration_confirmation(&self, registration: &Registration) -> Result<()> {
        if self.fail {
            return Err(TeamRegError::Notification("smtp relay refused".into()));
        }
        self.sent.lock().unwrap().push(team(registration));
        Ok(())
    }
}

/// Records `(action, team)` for every roster call.
#[derive(Default)]
pub(crate) struct RecordingRoster {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingRoster {
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, action: &str, registration: &Registration) {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), team(registration)));
    }
}

#[async_trait]
impl RosterSync for RecordingRoster {
    async fn append_team_row(&self, registration: &Registration) -> Result<()> {
        self.push("append", registration);
        Ok(())
    }

    async fn update_team_row(&self, registration: &Registration) -> Result<()> {
        self.push("update", registration);
        Ok(())
    }

    async fn remove_team_row(&self, registration: &Registration) -> Result<()> {
        self.push("remove", registration);
        Ok(())
    }
}

/// Wraps a real store and fails the next N saves with a transient error.
pub(crate) struct FlakyStore {
    inner: Arc<Storage>,
    failing_saves: AtomicU32,
}

impl FlakyStore {
    pub(crate) fn new(inner: Arc<Storage>, failing_saves: u32) -> Self {
        Self {
            inner,
            failing_saves: AtomicU32::new(failing_saves),
        }
    }

    pub(crate) fn fail_next_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistrationStore for FlakyStore {
    async fn load(&self, session_id: &str) -> Result<Option<Registration>> {
        self.inner.load_registration(session_id).await
    }

    async fn save(&self, registration: &Registration) -> Result<Registration> {
        let remaining = self.failing_saves.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_saves.store(remaining - 1, Ordering::SeqCst);
            return Err(TeamRegError::Storage("database is locked".into()));
        }
        self.inner.save_registration(registration).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.inner.delete_registration(session_id).await
    }

    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<Registration>> {
        self.inner.list_registrations(filter).await
    }

    async fn state_counts(&self) -> Result<Vec<(String, u64)>> {
        self.inner.state_counts().await
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        self.inner.record_delivery(record).await
    }

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>> {
        self.inner.list_deliveries(filter).await
    }
}
