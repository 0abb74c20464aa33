//! TrendChat TUI: terminal chat about social-media trends.
//!
//! A transcript pane, an input line and a status bar, built with
//! `ratatui` + `crossterm`. Logs go to `~/.trendchat/tui.log` so they never
//! draw over the screen.

mod app;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use trendchat_core::ConversationController;
use trendchat_shared::{config_dir, load_config, validate_api_key};

const LOG_FILE_NAME: &str = "tui.log";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let config = load_config()?;
    let api_key = validate_api_key(&config)?;
    let controller = ConversationController::from_config(&config, api_key)?;

    app::run(controller).await
}

/// Append logs to the TUI log file; `RUST_LOG` overrides the default level.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("cannot create {}: {e}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| eyre!("cannot open log file {}: {e}", path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendchat=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
