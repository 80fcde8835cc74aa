//! Blocking facade over the async engine and admin for the event loop.

use color_eyre::eyre::Result;
use teamreg_core::{Admin, ChatReply, RegistrationEngine, Services};
use teamreg_shared::{Registration, load_config};
use tokio::runtime::Runtime;

pub(crate) struct Backend {
    runtime: Runtime,
    engine: RegistrationEngine,
    admin: Admin,
    event_name: String,
}

impl Backend {
    /// Open the configured store and build the engine.
    pub(crate) fn open() -> Result<Self> {
        let runtime = Runtime::new()?;
        let config = load_config()?;
        let services = runtime.block_on(Services::open(&config, None))?;
        let engine = services.engine()?;
        let admin = services.admin();
        tracing::info!(event = %config.event.name, "tui backend ready");
        Ok(Self {
            runtime,
            engine,
            admin,
            event_name: config.event.name.clone(),
        })
    }

    pub(crate) fn event_name(&self) -> &str {
        &self.event_name
    }

    pub(crate) fn send(&self, session_id: &str, message: &str) -> teamreg_shared::Result<ChatReply> {
        self.runtime
            .block_on(self.engine.handle_message(session_id, message))
    }

    pub(crate) fn reset(&self, session_id: &str) -> teamreg_shared::Result<ChatReply> {
        self.runtime.block_on(self.engine.reset(session_id))
    }

    pub(crate) fn registrations(
        &self,
        state: Option<&str>,
    ) -> teamreg_shared::Result<Vec<Registration>> {
        self.runtime.block_on(self.admin.list(state))
    }

    pub(crate) fn delete(&self, session_id: &str) -> teamreg_shared::Result<Registration> {
        self.runtime.block_on(self.admin.delete(session_id))
    }

    /// Let in-flight notifications and roster calls finish.
    pub(crate) fn shutdown(&self) {
        self.runtime.block_on(self.engine.wait_for_background());
    }
}
