//! agswitch - account switcher for Antigravity
//!
//! Captures signed-in identities, binds a device fingerprint to each, and
//! switches between them one at a time.

use anyhow::Result;
use clap::Parser;

mod account_commands;
mod cli;
mod commands;
mod config_commands;
mod profile_commands;

use agswitch_core::modules::logger::init_logger;
use agswitch_core::modules::switch::describe_switch_metrics;
use agswitch_core::DataPaths;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::from_env()?,
    };
    paths.ensure_dirs()?;
    let _log_guard = init_logger(&paths.logs_dir(), "warn")?;
    describe_switch_metrics();
    tracing::debug!(data_dir = %paths.root().display(), "agswitch_started");

    match cli.command {
        Commands::Account(cmd) => commands::handle_account_command(&paths, cmd).await,
        Commands::Profile(cmd) => commands::handle_profile_command(&paths, cmd).await,
        Commands::Config(cmd) => commands::handle_config_command(&paths, cmd),
    }
}
