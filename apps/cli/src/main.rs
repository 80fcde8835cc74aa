//! teamreg CLI: conversational hackathon team registration.
//!
//! Serves the chat API, runs a terminal chat session, and provides the
//! admin back-office over the registration database.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
