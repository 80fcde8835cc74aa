//! Assembling the engine and admin from configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use teamreg_delivery::{HttpRosterSync, SmtpNotifier};
use teamreg_shared::{AppConfig, Result, validate_smtp_credentials};
use teamreg_storage::Storage;

use crate::admin::Admin;
use crate::collaborators::{LogOnlyNotifier, LogOnlyRoster, Notifier, RosterSync};
use crate::engine::{EngineSettings, RegistrationEngine};
use crate::faq::FaqResponder;
use crate::machine::IntakePolicy;

/// Opened store plus the configured (or log-only) collaborators.
pub struct Services {
    pub storage: Arc<Storage>,
    pub notifier: Arc<dyn Notifier>,
    pub roster: Arc<dyn RosterSync>,
    config: AppConfig,
}

impl Services {
    /// Open the database read-write and build the enabled collaborators.
    pub async fn open(config: &AppConfig, db_override: Option<&Path>) -> Result<Self> {
        let db_path = resolve_db_path(config, db_override);
        tracing::info!(db = %db_path.display(), "opening registration store");
        let storage = Arc::new(Storage::open(&db_path).await?);

        let notifier: Arc<dyn Notifier> = if config.smtp.enabled {
            validate_smtp_credentials(config)?;
            Arc::new(SmtpNotifier::from_config(&config.smtp, &config.event)?)
        } else {
            Arc::new(LogOnlyNotifier)
        };

        let roster: Arc<dyn RosterSync> = match HttpRosterSync::from_config(config)? {
            Some(sync) => Arc::new(sync),
            None => Arc::new(LogOnlyRoster),
        };

        Ok(Self {
            storage,
            notifier,
            roster,
            config: config.clone(),
        })
    }

    /// Open the database read-only, for reporting. Collaborators are log-only.
    pub async fn open_readonly(config: &AppConfig, db_override: Option<&Path>) -> Result<Self> {
        let db_path = resolve_db_path(config, db_override);
        let storage = Arc::new(Storage::open_readonly(&db_path).await?);
        Ok(Self {
            storage,
            notifier: Arc::new(LogOnlyNotifier),
            roster: Arc::new(LogOnlyRoster),
            config: config.clone(),
        })
    }

    pub fn engine(&self) -> Result<RegistrationEngine> {
        let faq = FaqResponder::new(&self.config.faq)?;
        Ok(RegistrationEngine::new(
            self.storage.clone(),
            self.notifier.clone(),
            self.roster.clone(),
            EngineSettings::from(&self.config),
        )
        .with_faq(faq))
    }

    pub fn admin(&self) -> Admin {
        Admin::new(
            self.storage.clone(),
            self.roster.clone(),
            IntakePolicy::from(&self.config),
        )
    }
}

/// `--db` wins over `[storage] db_path`.
pub fn resolve_db_path(config: &AppConfig, db_override: Option<&Path>) -> PathBuf {
    db_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.db_path))
}
