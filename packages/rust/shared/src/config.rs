//! Application configuration for team registration.
//!
//! User config lives at `~/.teamreg/teamreg.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TeamRegError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "teamreg.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".teamreg";

// ---------------------------------------------------------------------------
// Config structs (matching teamreg.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Event details used in prompts and e-mails.
    #[serde(default)]
    pub event: EventConfig,

    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policy for transient storage failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Input handling policies.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Confirmation e-mail settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Roster spreadsheet sync settings.
    #[serde(default)]
    pub roster: RosterConfig,

    /// HTTP chat server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Canned answers for questions asked mid-registration.
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
}

/// `[event]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Event name shown in the welcome prompt and e-mail subject.
    #[serde(default = "default_event_name")]
    pub name: String,

    /// Where participants can reach the organizers.
    #[serde(default = "default_contact")]
    pub contact: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            name: default_event_name(),
            contact: default_contact(),
        }
    }
}

fn default_event_name() -> String {
    "the hackathon".into()
}
fn default_contact() -> String {
    "the organizing committee".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/teamreg.db".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts for a storage call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled for each further retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    100
}

/// `[intake]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Treat "Bindu  Silva" and "Bindu Silva" as the same name.
    #[serde(default)]
    pub collapse_internal_whitespace: bool,

    /// Require index numbers to start with the team's batch digits.
    #[serde(default)]
    pub require_batch_prefix: bool,
}

/// `[smtp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Send confirmation e-mails at all.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Use STARTTLS (otherwise plain, for local relays).
    #[serde(default = "default_true")]
    pub starttls: bool,

    /// Name of the env var holding the SMTP username.
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the SMTP password (never store it here).
    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(default)]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_smtp_host(),
            port: default_smtp_port(),
            starttls: true,
            username_env: default_username_env(),
            password_env: default_password_env(),
            from_email: String::new(),
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_username_env() -> String {
    "TEAMREG_SMTP_USERNAME".into()
}
fn default_password_env() -> String {
    "TEAMREG_SMTP_PASSWORD".into()
}
fn default_from_name() -> String {
    "Registration Desk".into()
}

/// `[roster]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Mirror registrations into the roster spreadsheet.
    #[serde(default)]
    pub enabled: bool,

    /// Spreadsheet webhook receiving `{action, teamName, row}` JSON.
    #[serde(default)]
    pub endpoint_url: String,

    /// Name of the env var holding the webhook bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_roster_timeout")]
    pub timeout_secs: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: String::new(),
            token_env: default_token_env(),
            timeout_secs: default_roster_timeout(),
        }
    }
}

fn default_token_env() -> String {
    "TEAMREG_ROSTER_TOKEN".into()
}
fn default_roster_timeout() -> u64 {
    10
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address for `teamreg serve`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3100".into()
}

/// `[[faq]]` entry: a canned answer selected by keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Whole words that select this answer.
    pub keywords: Vec<String>,
    /// Reply text.
    pub answer: String,
}

// ---------------------------------------------------------------------------
// Runtime policies (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime retry policy for transient storage failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetryPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.retry.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry.base_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.teamreg/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TeamRegError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.teamreg/teamreg.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TeamRegError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TeamRegError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TeamRegError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TeamRegError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TeamRegError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that SMTP is fully configured when enabled.
pub fn validate_smtp_credentials(config: &AppConfig) -> Result<()> {
    let smtp = &config.smtp;
    if !smtp.enabled {
        return Ok(());
    }
    if smtp.from_email.is_empty() {
        return Err(TeamRegError::config(
            "smtp.from_email must be set when smtp.enabled = true",
        ));
    }
    for var_name in [&smtp.username_env, &smtp.password_env] {
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(TeamRegError::config(format!(
                    "SMTP credentials not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}

/// Check that the roster endpoint is a usable http(s) URL when enabled.
pub fn validate_roster_endpoint(config: &AppConfig) -> Result<Option<Url>> {
    let roster = &config.roster;
    if !roster.enabled {
        return Ok(None);
    }
    let url = Url::parse(&roster.endpoint_url).map_err(|e| {
        TeamRegError::config(format!(
            "invalid roster.endpoint_url '{}': {e}",
            roster.endpoint_url
        ))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TeamRegError::config(format!(
            "roster.endpoint_url must be http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(Some(url))
}
