//! Roster spreadsheet sync over an HTTP webhook.
//!
//! The endpoint (typically a spreadsheet script deployed as a web app)
//! receives one JSON document per change:
//!
//! ```json
//! { "action": "append", "teamName": "Phoenix", "row": ["Phoenix", "23", ...] }
//! ```
//!
//! Rows are keyed by team name; `remove` carries no row.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use teamreg_shared::{AppConfig, Registration, Result, TEAM_SIZE, TeamRegError};
use url::Url;

/// User-Agent sent with every webhook call.
const USER_AGENT: &str = concat!("teamreg/", env!("CARGO_PKG_VERSION"));

/// What the webhook should do with the team's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterAction {
    Append,
    Update,
    Remove,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RosterPayload<'a> {
    action: RosterAction,
    team_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    row: Option<Vec<String>>,
}

/// Mirrors registrations into the roster spreadsheet.
pub struct HttpRosterSync {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpRosterSync {
    pub fn new(endpoint: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TeamRegError::RosterSync(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// Build from `[roster]`. Returns `None` when roster sync is disabled.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some(endpoint) = teamreg_shared::validate_roster_endpoint(config)? else {
            return Ok(None);
        };
        let token = std::env::var(&config.roster.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(
                var = %config.roster.token_env,
                "roster token not set, calling webhook without authorization"
            );
        }
        let timeout = Duration::from_secs(config.roster.timeout_secs);
        Self::new(endpoint, token, timeout).map(Some)
    }

    pub async fn append(&self, registration: &Registration) -> Result<()> {
        self.post(RosterAction::Append, registration).await
    }

    pub async fn update(&self, registration: &Registration) -> Result<()> {
        self.post(RosterAction::Update, registration).await
    }

    pub async fn remove(&self, registration: &Registration) -> Result<()> {
        self.post(RosterAction::Remove, registration).await
    }

    #[tracing::instrument(skip_all, fields(action = ?action, session_id = %registration.session_id))]
    async fn post(&self, action: RosterAction, registration: &Registration) -> Result<()> {
        let team_name = registration
            .team_name
            .as_deref()
            .ok_or_else(|| TeamRegError::RosterSync("registration has no team name".into()))?;

        let payload = RosterPayload {
            action,
            team_name,
            row: (action != RosterAction::Remove).then(|| roster_row(registration)),
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TeamRegError::RosterSync(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TeamRegError::RosterSync(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        tracing::info!(team = team_name, "roster updated");
        Ok(())
    }
}

/// Spreadsheet row: team, batch, then name/index/email for each of the four
/// member slots (blank when missing), then the registration timestamp.
pub fn roster_row(registration: &Registration) -> Vec<String> {
    let mut row = Vec::with_capacity(3 + TEAM_SIZE * 3);
    row.push(registration.team_name.clone().unwrap_or_default());
    row.push(registration.team_batch.clone().unwrap_or_default());
    for slot in 0..TEAM_SIZE {
        match registration.members.get(slot) {
            Some(member) => {
                row.push(member.full_name.clone());
                row.push(member.index_number.clone());
                row.push(member.email.clone());
            }
            None => row.extend(std::iter::repeat_n(String::new(), 3)),
        }
    }
    row.push(registration.updated_at.to_rfc3339());
    row
}
