//! Macropad host CLI
//!
//! Watches for the macropad, keeps a session open while it is plugged in and
//! maps button chords to media player commands.

use anyhow::Context;
use clap::Parser;
use macropad::Config;
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    match cli.command {
        None => commands::run::run(&config, false, None)?,
        Some(Commands::Run { connect, port }) => commands::run::run(&config, connect, port)?,
        Some(Commands::Compile { file }) => commands::compile::compile(&file)?,
        Some(Commands::Ports) => commands::ports::ports(&config)?,
    }

    Ok(())
}
