// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "macropad")]
#[command(author, version, about = "Host controller for the five-key USB-serial macropad")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/macropad/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch for the device and run the operator shell (default)
    Run {
        /// Connect to the configured default port immediately
        #[arg(long)]
        connect: bool,

        /// Override the default port
        #[arg(long)]
        port: Option<String>,
    },

    /// Compile a profile document and print the encoded program as hex
    #[command(visible_aliases = ["c"])]
    Compile {
        /// Profile document (JSON)
        file: PathBuf,
    },

    /// List serial ports and whether they match the device
    #[command(visible_aliases = ["list", "ls"])]
    Ports,
}
