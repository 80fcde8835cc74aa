//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use teamreg_core::reply::summary;
use teamreg_core::{ResyncProgress, ResyncSummary, Services};
use teamreg_shared::{AppConfig, MemberField, Registration, init_config, load_config};
use teamreg_storage::DeliveryFilter;

use crate::server;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// teamreg: conversational hackathon team registration.
#[derive(Parser)]
#[command(
    name = "teamreg",
    version,
    about = "Register hackathon teams through a chat conversation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides [storage].db_path).
    #[arg(long, global = true, env = "TEAMREG_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the HTTP chat API.
    Serve {
        /// Bind address (defaults to [server].bind).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Register a team from the terminal.
    Chat {
        /// Session ID to resume (defaults to a new one).
        #[arg(long)]
        session: Option<String>,
    },

    /// Inspect and correct stored registrations.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Admin subcommands.
#[derive(Subcommand)]
pub(crate) enum AdminAction {
    /// List registrations.
    List {
        /// Only this state (welcome, batch_selection, member_details, confirmation, done).
        #[arg(long)]
        state: Option<String>,
    },
    /// Show one registration.
    Show {
        session: String,
        /// Print the stored JSON document.
        #[arg(long)]
        json: bool,
    },
    /// Delete a registration (and its roster row if completed).
    Delete { session: String },
    /// Change a team's name.
    RenameTeam { session: String, name: String },
    /// Change one field of a registered member.
    EditMember {
        session: String,
        /// Member position, 1 to 4.
        member: usize,
        field: MemberFieldArg,
        value: String,
    },
    /// Re-send every completed registration to the roster.
    Resync,
    /// Show the e-mail / roster delivery log.
    Deliveries {
        /// Only failed deliveries.
        #[arg(long)]
        failed: bool,
        /// Only this session.
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
}

/// Member field names accepted by `edit-member`.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum MemberFieldArg {
    Name,
    Index,
    Email,
}

impl From<MemberFieldArg> for MemberField {
    fn from(arg: MemberFieldArg) -> Self {
        match arg {
            MemberFieldArg::Name => MemberField::FullName,
            MemberFieldArg::Index => MemberField::IndexNumber,
            MemberFieldArg::Email => MemberField::Email,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "teamreg=info",
        1 => "teamreg=debug",
        _ => "teamreg=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db.as_deref();
    match cli.command {
        Command::Serve { bind } => cmd_serve(db, bind.as_deref()).await,
        Command::Chat { session } => cmd_chat(db, session).await,
        Command::Admin { action } => match action {
            AdminAction::List { state } => cmd_admin_list(db, state.as_deref()).await,
            AdminAction::Show { session, json } => cmd_admin_show(db, &session, json).await,
            AdminAction::Delete { session } => cmd_admin_delete(db, &session).await,
            AdminAction::RenameTeam { session, name } => {
                cmd_admin_rename(db, &session, &name).await
            }
            AdminAction::EditMember {
                session,
                member,
                field,
                value,
            } => cmd_admin_edit_member(db, &session, member, field.into(), &value).await,
            AdminAction::Resync => cmd_admin_resync(db).await,
            AdminAction::Deliveries {
                failed,
                session,
                limit,
            } => cmd_admin_deliveries(db, failed, session, limit).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn open_services(db: Option<&Path>) -> Result<Services> {
    let config = load_config()?;
    Ok(Services::open(&config, db).await?)
}

async fn open_services_readonly(db: Option<&Path>) -> Result<Services> {
    let config = load_config()?;
    Ok(Services::open_readonly(&config, db).await?)
}

// ---------------------------------------------------------------------------
// serve / chat
// ---------------------------------------------------------------------------

async fn cmd_serve(db: Option<&Path>, bind: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let services = Services::open(&config, db).await?;
    let engine = Arc::new(services.engine()?);

    let bind = bind.unwrap_or(&config.server.bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| eyre!("cannot bind {bind}: {e}"))?;
    info!(addr = %listener.local_addr()?, event = %config.event.name, "chat server listening");

    axum::serve(listener, server::router(engine.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("draining background deliveries");
    engine.wait_for_background().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn cmd_chat(db: Option<&Path>, session: Option<String>) -> Result<()> {
    let services = open_services(db).await?;
    let engine = services.engine()?;
    let session = session.unwrap_or_else(|| format!("cli-{}", uuid::Uuid::now_v7()));

    println!("Session: {session}  (type 'restart' to start over, Ctrl-D to quit)");
    println!();

    // An empty message yields the prompt for wherever the session stands.
    print_reply(&engine.handle_message(&session, "").await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = engine.handle_message(&session, &line).await?;
        print_reply(&reply);
    }

    engine.wait_for_background().await;
    Ok(())
}

fn print_reply(reply: &teamreg_core::ChatReply) {
    println!("{}", reply.message);
    if let Some(buttons) = &reply.buttons {
        println!("  [{}]", buttons.join("] ["));
    }
    println!();
}

// ---------------------------------------------------------------------------
// admin
// ---------------------------------------------------------------------------

async fn cmd_admin_list(db: Option<&Path>, state: Option<&str>) -> Result<()> {
    let services = open_services_readonly(db).await?;
    let admin = services.admin();
    let registrations = admin.list(state).await?;

    if registrations.is_empty() {
        println!("No registrations.");
        return Ok(());
    }

    println!(
        "{:<38} {:<24} {:<5} {:<15} {:>7}  {}",
        "SESSION", "TEAM", "BATCH", "STATE", "MEMBERS", "UPDATED"
    );
    for reg in &registrations {
        println!(
            "{:<38} {:<24} {:<5} {:<15} {:>7}  {}",
            reg.session_id,
            reg.team_name.as_deref().unwrap_or("-"),
            reg.team_batch.as_deref().unwrap_or("-"),
            reg.state.label(),
            reg.members.len(),
            reg.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }

    println!();
    let counts = admin.state_counts().await?;
    let totals: Vec<String> = counts
        .iter()
        .map(|(state, count)| format!("{state}: {count}"))
        .collect();
    println!("  {}", totals.join("  "));
    Ok(())
}

async fn cmd_admin_show(db: Option<&Path>, session: &str, json: bool) -> Result<()> {
    let services = open_services_readonly(db).await?;
    let registration = services.admin().show(session).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&registration)?);
    } else {
        print_registration(&registration);
    }
    Ok(())
}

fn print_registration(registration: &Registration) {
    println!();
    println!("  Session: {}", registration.session_id);
    println!("  State:   {}", registration.state);
    println!("  Version: {}", registration.version);
    println!();
    for line in summary(registration).lines() {
        println!("  {line}");
    }
    if let Some(staged) = registration.staged_member() {
        println!(
            "  (entering member {}: {} | {} | {})",
            registration.members.len() + 1,
            staged.full_name.as_deref().unwrap_or("?"),
            staged.index_number.as_deref().unwrap_or("?"),
            staged.email.as_deref().unwrap_or("?"),
        );
    }
    println!();
}

async fn cmd_admin_delete(db: Option<&Path>, session: &str) -> Result<()> {
    let services = open_services(db).await?;
    let deleted = services.admin().delete(session).await?;
    println!(
        "Deleted registration {} ({}).",
        deleted.session_id,
        deleted.team_name.as_deref().unwrap_or("unnamed")
    );
    Ok(())
}

async fn cmd_admin_rename(db: Option<&Path>, session: &str, name: &str) -> Result<()> {
    let services = open_services(db).await?;
    let saved = services.admin().rename_team(session, name).await?;
    println!("Team renamed.");
    print_registration(&saved);
    Ok(())
}

async fn cmd_admin_edit_member(
    db: Option<&Path>,
    session: &str,
    member: usize,
    field: MemberField,
    value: &str,
) -> Result<()> {
    let services = open_services(db).await?;
    let saved = services
        .admin()
        .edit_member(session, member, field, value)
        .await?;
    println!("Member {member} {} updated.", field.label());
    print_registration(&saved);
    Ok(())
}

async fn cmd_admin_resync(db: Option<&Path>) -> Result<()> {
    let services = open_services(db).await?;
    let progress = CliProgress::new();
    let summary = services.admin().resync(&progress).await?;

    println!();
    println!("  Roster resync finished.");
    println!("  Teams:  {}", summary.attempted);
    println!("  Failed: {}", summary.failed);
    println!();

    if summary.failed > 0 {
        return Err(eyre!(
            "{} team(s) failed to sync; see `teamreg admin deliveries --failed`",
            summary.failed
        ));
    }
    Ok(())
}

async fn cmd_admin_deliveries(
    db: Option<&Path>,
    failed: bool,
    session: Option<String>,
    limit: u32,
) -> Result<()> {
    let services = open_services_readonly(db).await?;
    let filter = DeliveryFilter {
        session_id: session,
        failed_only: failed,
        limit,
    };
    let deliveries = services.admin().deliveries(&filter).await?;

    if deliveries.is_empty() {
        println!("No deliveries recorded.");
        return Ok(());
    }

    println!(
        "{:<20} {:<38} {:<7} {:<13} {:<6}  {}",
        "WHEN", "SESSION", "CHANNEL", "ACTION", "OK", "DETAIL"
    );
    for d in &deliveries {
        println!(
            "{:<20} {:<38} {:<7} {:<13} {:<6}  {}",
            d.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            d.session_id,
            d.channel.as_str(),
            d.action.as_str(),
            if d.delivered { "yes" } else { "no" },
            d.detail.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Resync progress using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl ResyncProgress for CliProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn team_synced(&self, team: &str, ok: bool) {
        self.bar.inc(1);
        if ok {
            self.bar.set_message(team.to_string());
        } else {
            self.bar.println(format!("  failed: {team}"));
        }
    }

    fn done(&self, _summary: &ResyncSummary) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
