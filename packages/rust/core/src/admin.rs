//! Back-office operations on stored registrations.
//!
//! Used by `teamreg admin` and the TUI browser. Edits go through the same
//! validators, duplicate guard and store checks as the chat engine; completed
//! registrations are mirrored to the roster synchronously so the operator
//! sees the outcome.

use std::sync::Arc;

use tracing::{info, instrument};

use teamreg_intake::is_valid_team_name;
use teamreg_shared::{
    DeliveryAction, DeliveryChannel, DeliveryRecord, Field, MemberField, Registration, Result,
    TeamRegError,
};
use teamreg_storage::{DeliveryFilter, RegistrationFilter};

use crate::collaborators::{RegistrationStore, RosterSync};
use crate::engine::record_delivery;
use crate::machine::{self, IntakePolicy};

/// Progress callback for [`Admin::resync`].
pub trait ResyncProgress: Send + Sync {
    /// Called once with the number of completed registrations.
    fn start(&self, total: usize);
    /// Called after each roster call.
    fn team_synced(&self, team: &str, ok: bool);
    fn done(&self, summary: &ResyncSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ResyncProgress for SilentProgress {
    fn start(&self, _total: usize) {}
    fn team_synced(&self, _team: &str, _ok: bool) {}
    fn done(&self, _summary: &ResyncSummary) {}
}

/// Result of [`Admin::resync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub attempted: usize,
    pub failed: usize,
}

pub struct Admin {
    store: Arc<dyn RegistrationStore>,
    roster: Arc<dyn RosterSync>,
    policy: IntakePolicy,
}

impl Admin {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        roster: Arc<dyn RosterSync>,
        policy: IntakePolicy,
    ) -> Self {
        Self {
            store,
            roster,
            policy,
        }
    }

    pub async fn list(&self, state: Option<&str>) -> Result<Vec<Registration>> {
        let filter = RegistrationFilter {
            state: state.map(str::to_uppercase),
        };
        self.store.list(&filter).await
    }

    pub async fn state_counts(&self) -> Result<Vec<(String, u64)>> {
        self.store.state_counts().await
    }

    pub async fn show(&self, session_id: &str) -> Result<Registration> {
        self.store
            .load(session_id)
            .await?
            .ok_or_else(|| TeamRegError::NotFound {
                session_id: session_id.to_string(),
            })
    }

    pub async fn deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>> {
        self.store.list_deliveries(filter).await
    }

    /// Delete a registration; completed teams are removed from the roster.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn delete(&self, session_id: &str) -> Result<Registration> {
        let existing = self.show(session_id).await?;
        self.store.delete(session_id).await?;
        info!(state = existing.state.label(), "registration deleted");

        if existing.is_done() {
            let outcome = self.roster.remove_team_row(&existing).await;
            self.record(&existing, DeliveryAction::Remove, outcome).await;
        }
        Ok(existing)
    }

    /// Change the team name, subject to format and global uniqueness.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn rename_team(&self, session_id: &str, new_name: &str) -> Result<Registration> {
        let existing = self.show(session_id).await?;
        let name = new_name.trim();
        if !is_valid_team_name(name) {
            return Err(TeamRegError::validation(
                machine::Rejection::Format(Field::TeamName).message(),
            ));
        }

        let mut working = existing.clone();
        working.team_name = Some(name.to_string());
        let saved = self.store.save(&working).await?;
        info!(team = name, "team renamed");

        if saved.is_done() {
            // Rows are keyed by team name: drop the old row, add the new one.
            let outcome = self.roster.remove_team_row(&existing).await;
            self.record(&existing, DeliveryAction::Remove, outcome).await;
            let outcome = self.roster.append_team_row(&saved).await;
            self.record(&saved, DeliveryAction::Append, outcome).await;
        }
        Ok(saved)
    }

    /// Replace one field of committed member `member_number` (1-based).
    #[instrument(skip_all, fields(session_id = %session_id, member_number = member_number, field = field.label()))]
    pub async fn edit_member(
        &self,
        session_id: &str,
        member_number: usize,
        field: MemberField,
        value: &str,
    ) -> Result<Registration> {
        let existing = self.show(session_id).await?;
        if member_number == 0 || member_number > existing.members.len() {
            return Err(TeamRegError::validation(format!(
                "member {member_number} does not exist (team has {} members)",
                existing.members.len()
            )));
        }
        let slot = member_number - 1;

        let value = machine::normalize(Field::Member(field), value);
        machine::check_member_value(field, &value, &existing, Some(slot), self.policy)
            .map_err(|rejection| TeamRegError::validation(rejection.message()))?;

        let mut working = existing.clone();
        working.members[slot].set(field, value);
        let saved = self.store.save(&working).await?;
        info!("member updated");

        if saved.is_done() {
            let outcome = self.roster.update_team_row(&saved).await;
            self.record(&saved, DeliveryAction::Update, outcome).await;
        }
        Ok(saved)
    }

    /// Append every completed registration to the roster again.
    #[instrument(skip_all)]
    pub async fn resync(&self, progress: &dyn ResyncProgress) -> Result<ResyncSummary> {
        let done = self.list(Some("DONE")).await?;
        progress.start(done.len());

        let mut summary = ResyncSummary::default();
        for registration in &done {
            let outcome = self.roster.append_team_row(registration).await;
            let ok = outcome.is_ok();
            self.record(registration, DeliveryAction::Append, outcome).await;

            summary.attempted += 1;
            if !ok {
                summary.failed += 1;
            }
            progress.team_synced(registration.team_name.as_deref().unwrap_or_default(), ok);
        }

        info!(attempted = summary.attempted, failed = summary.failed, "roster resync finished");
        progress.done(&summary);
        Ok(summary)
    }

    async fn record(&self, registration: &Registration, action: DeliveryAction, outcome: Result<()>) {
        record_delivery(
            self.store.as_ref(),
            registration,
            DeliveryChannel::Roster,
            action,
            outcome,
        )
        .await;
    }
}
