//! The conversation engine: one chat message in, one reply out.
//!
//! Per message:
//! 1. serialize on the session lock
//! 2. handle control commands (`restart`)
//! 3. classify: questions go to the FAQ path and never change state
//! 4. apply the answer to a copy of the registration
//! 5. persist the copy (check-and-set on `version`) before replying
//! 6. on the transition into `DONE`, dispatch e-mail and roster sync as
//!    background tasks

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use teamreg_intake::looks_like_registration_data;
use teamreg_shared::{
    AppConfig, DeliveryAction, DeliveryChannel, DeliveryRecord, Registration, RegistrationState,
    Result, RetryPolicy, TeamRegError,
};

use crate::collaborators::{Notifier, RegistrationStore, RosterSync};
use crate::faq::FaqResponder;
use crate::locks::SessionLocks;
use crate::machine::{self, IntakePolicy, Rejection, Transition};
use crate::reply::{self, ChatReply, Outcome};
use crate::retry::with_retry;

/// Messages that delete the session's registration and start over.
const RESET_COMMANDS: [&str; 3] = ["restart", "reset", "start over"];

/// Engine settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub event_name: String,
    pub contact: String,
    pub intake: IntakePolicy,
    pub retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            event_name: config.event.name.clone(),
            contact: config.event.contact.clone(),
            intake: IntakePolicy::from(config),
            retry: RetryPolicy::from(config),
        }
    }
}

/// Whether `message` is a reset command.
pub fn is_reset_command(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    RESET_COMMANDS.contains(&lower.as_str())
}

/// Drives registrations through the conversation.
pub struct RegistrationEngine {
    store: Arc<dyn RegistrationStore>,
    notifier: Arc<dyn Notifier>,
    roster: Arc<dyn RosterSync>,
    faq: FaqResponder,
    settings: EngineSettings,
    locks: SessionLocks,
    background: Mutex<JoinSet<()>>,
}

impl RegistrationEngine {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        notifier: Arc<dyn Notifier>,
        roster: Arc<dyn RosterSync>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            roster,
            faq: FaqResponder::default(),
            settings,
            locks: SessionLocks::new(),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_faq(mut self, faq: FaqResponder) -> Self {
        self.faq = faq;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Handle one inbound chat message for `session_id`.
    ///
    /// Rejections, conflicts and exhausted retries are ordinary replies;
    /// `Err` is reserved for bad input (empty session ID) and storage
    /// failures that are not worth retrying.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn handle_message(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        if session_id.trim().is_empty() {
            return Err(TeamRegError::validation("session ID must not be empty"));
        }
        let _guard = self.locks.acquire(session_id).await;

        if is_reset_command(message) {
            return self.reset_locked(session_id).await;
        }

        let current = match with_retry(&self.settings.retry, "load", || {
            self.store.load(session_id)
        })
        .await
        {
            Ok(found) => found.unwrap_or_else(|| Registration::new(session_id)),
            Err(e) if e.is_transient() => {
                warn!(error = %e, "storage unavailable on load");
                return Ok(self.unavailable(&Registration::new(session_id)));
            }
            Err(e) => return Err(e),
        };

        if !looks_like_registration_data(message) {
            return Ok(self.informational(&current, message));
        }

        if current.is_done() {
            let team = current.team_name.as_deref().unwrap_or("Your team");
            return Ok(ChatReply::new(
                format!(
                    "Team {team} is already registered. Type 'restart' to register a different team."
                ),
                None,
                &current,
                Outcome::AlreadyDone,
            ));
        }

        let mut working = current.clone();
        let transition = match machine::apply(&mut working, message, self.settings.intake) {
            Ok(transition) => transition,
            Err(rejection) => return Ok(self.rejected(&current, rejection)),
        };

        if transition == Transition::Stay {
            // "no" at confirmation
            return Ok(ChatReply::new(
                format!(
                    "No problem. Type 'restart' to enter the details again, or contact {} if only a detail needs fixing.",
                    self.settings.contact
                ),
                Some(vec!["Yes".into(), "restart".into()]),
                &current,
                Outcome::Declined,
            ));
        }

        let saved = match with_retry(&self.settings.retry, "save", || self.store.save(&working))
            .await
        {
            Ok(saved) => saved,
            Err(TeamRegError::Conflict { field, value }) => {
                info!(%field, "value owned by another team");
                return Ok(self.rejected(&current, Rejection::Conflict { field, value }));
            }
            Err(TeamRegError::StaleWrite { .. }) => {
                warn!("lost a concurrent write");
                return Ok(self.rejected(&current, Rejection::StaleWrite));
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "storage unavailable on save");
                return Ok(self.unavailable(&current));
            }
            Err(e) => return Err(e),
        };

        info!(
            from = current.state.label(),
            to = saved.state.label(),
            version = saved.version,
            "registration advanced"
        );

        let (text, buttons) = reply::prompt(&saved, &self.settings.event_name);
        if transition == Transition::Completed {
            self.dispatch_completion(&saved).await;
            return Ok(ChatReply::new(text, buttons, &saved, Outcome::Completed));
        }
        Ok(ChatReply::new(text, buttons, &saved, Outcome::Accepted))
    }

    /// Delete the session's registration and return the welcome prompt.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn reset(&self, session_id: &str) -> Result<ChatReply> {
        let _guard = self.locks.acquire(session_id).await;
        self.reset_locked(session_id).await
    }

    async fn reset_locked(&self, session_id: &str) -> Result<ChatReply> {
        let fresh = Registration::new(session_id);
        let existing = match with_retry(&self.settings.retry, "load", || {
            self.store.load(session_id)
        })
        .await
        {
            Ok(existing) => existing,
            Err(e) if e.is_transient() => return Ok(self.unavailable(&fresh)),
            Err(e) => return Err(e),
        };

        if let Some(existing) = existing {
            match with_retry(&self.settings.retry, "delete", || {
                self.store.delete(session_id)
            })
            .await
            {
                Ok(_) => {}
                Err(e) if e.is_transient() => return Ok(self.unavailable(&existing)),
                Err(e) => return Err(e),
            }
            info!(state = existing.state.label(), "registration reset");
            if existing.is_done() {
                self.dispatch_removal(&existing).await;
            }
        }

        let (text, buttons) = reply::prompt(&fresh, &self.settings.event_name);
        Ok(ChatReply::new(text, buttons, &fresh, Outcome::Reset))
    }

    /// Wait for every dispatched e-mail and roster task to finish.
    pub async fn wait_for_background(&self) {
        let mut tasks = self.background.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "background task panicked");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Replies
    // -----------------------------------------------------------------------

    fn rejected(&self, registration: &Registration, rejection: Rejection) -> ChatReply {
        let (question, buttons) = reply::prompt(registration, &self.settings.event_name);
        ChatReply::new(
            format!("{} {question}", rejection.message()),
            buttons,
            registration,
            Outcome::Rejected(rejection),
        )
    }

    fn informational(&self, registration: &Registration, message: &str) -> ChatReply {
        let (question, buttons) = reply::prompt(registration, &self.settings.event_name);
        let text = match self.faq.answer(message) {
            Some(answer) if registration.is_done() => answer.to_string(),
            Some(answer) => format!("{answer}\n\n{question}"),
            None if registration.state == RegistrationState::Welcome => question,
            None if registration.is_done() => format!(
                "Your registration is complete. For anything else please contact {}.",
                self.settings.contact
            ),
            None => format!("I'm here to help you register. {question}"),
        };
        ChatReply::new(text, buttons, registration, Outcome::Informational)
    }

    fn unavailable(&self, registration: &Registration) -> ChatReply {
        ChatReply::new(
            "We couldn't save your answer right now. Please try again in a moment.",
            None,
            registration,
            Outcome::Unavailable,
        )
    }

    // -----------------------------------------------------------------------
    // Background delivery
    // -----------------------------------------------------------------------

    async fn dispatch_completion(&self, registration: &Registration) {
        let mut tasks = self.background.lock().await;
        while tasks.try_join_next().is_some() {}

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let reg = registration.clone();
        tasks.spawn(async move {
            let outcome = notifier.send_registration_confirmation(&reg).await;
            record_delivery(
                store.as_ref(),
                &reg,
                DeliveryChannel::Email,
                DeliveryAction::Confirmation,
                outcome,
            )
            .await;
        });

        let store = self.store.clone();
        let roster = self.roster.clone();
        let reg = registration.clone();
        tasks.spawn(async move {
            let outcome = roster.append_team_row(&reg).await;
            record_delivery(
                store.as_ref(),
                &reg,
                DeliveryChannel::Roster,
                DeliveryAction::Append,
                outcome,
            )
            .await;
        });
    }

    async fn dispatch_removal(&self, registration: &Registration) {
        let mut tasks = self.background.lock().await;
        while tasks.try_join_next().is_some() {}

        let store = self.store.clone();
        let roster = self.roster.clone();
        let reg = registration.clone();
        tasks.spawn(async move {
            let outcome = roster.remove_team_row(&reg).await;
            record_delivery(
                store.as_ref(),
                &reg,
                DeliveryChannel::Roster,
                DeliveryAction::Remove,
                outcome,
            )
            .await;
        });
    }
}

/// Log a collaborator outcome and append it to the delivery log.
pub(crate) async fn record_delivery(
    store: &dyn RegistrationStore,
    registration: &Registration,
    channel: DeliveryChannel,
    action: DeliveryAction,
    outcome: Result<()>,
) {
    let session_id = registration.session_id.as_str();
    let record = match outcome {
        Ok(()) => DeliveryRecord::delivered(session_id, channel, action),
        Err(e) => {
            warn!(
                session_id,
                channel = channel.as_str(),
                action = action.as_str(),
                error = %e,
                "delivery failed"
            );
            DeliveryRecord::failed(session_id, channel, action, e.to_string())
        }
    };
    if let Err(e) = store.record_delivery(&record).await {
        warn!(session_id, error = %e, "could not record delivery");
    }
}
