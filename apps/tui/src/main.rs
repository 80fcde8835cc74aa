mod app;
mod backend;
mod screens;
mod widgets;

use std::fs::{self, File};
use std::sync::Mutex;

use color_eyre::eyre::Result;
use teamreg_shared::config_dir;

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;
    app::run()
}

/// Logs go to a file; stderr belongs to the terminal UI.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("tui.log"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("teamreg=info"));
    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
