//! CLI entry point for hovercard.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use hovercard_app::{HovercardConfig, viewer_id};

mod commands;
mod tui;

/// Profile hover cards for forum usernames.
#[derive(Parser, Debug)]
#[command(
    name = "hovercard",
    version,
    about = "hovercard: cached, rate-limited profile cards for forum usernames"
)]
struct Cli {
    /// Path to the configuration file (defaults to <config dir>/hovercard/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(long)]
    api: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print one user's card.
    Show {
        username: String,
        /// Bypass the cache.
        #[arg(long)]
        refresh: bool,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Launch the interactive roster.
    Tui {
        /// Usernames listed in the roster.
        usernames: Vec<String>,
    },
}

fn main() -> Result<()> {
    let Cli { config, api, cmd } = Cli::parse();

    if should_install_tracing(&cmd) {
        install_tracing();
    }

    let config = load_config(config, api)?;
    execute_command(&config, cmd)
}

fn load_config(path: Option<PathBuf>, api: Option<String>) -> Result<HovercardConfig> {
    let mut config = HovercardConfig::load(path.as_deref())?;
    if let Some(base_url) = api {
        config.api.base_url = base_url;
        config.validate().context("invalid --api value")?;
    }
    Ok(config)
}

fn execute_command(config: &HovercardConfig, command: Command) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let viewer = viewer_id();
    match command {
        Command::Tui { usernames } => tui::run(config, usernames, viewer, runtime.handle().clone()),
        other => runtime.block_on(commands::run(other, config, viewer)),
    }
}

const fn should_install_tracing(cmd: &Command) -> bool {
    !matches!(cmd, Command::Tui { .. })
}

fn install_tracing() {
    // EnvFilterに RUST_LOG を渡せる。デフォルトは INFO。
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
