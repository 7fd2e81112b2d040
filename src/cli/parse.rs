//! CLI parse: clap types for hotelc. No behavior; definitions only.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// hotelc - game server telemetry engine
#[derive(Parser)]
#[command(name = "hotelc")]
#[command(about = "Export game server metrics and player session traces over OTLP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML or JSON; overrides the per-user config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration, then print the effective values
    Check {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Drive a synthetic server session through a real engine
    Simulate {
        /// Number of players that connect, get ready and disconnect
        #[arg(long, default_value_t = 3)]
        players: usize,
        /// Blocks placed and broken per player
        #[arg(long, default_value_t = 10)]
        blocks: usize,
        /// Record exports in memory instead of sending them to the collector
        #[arg(long)]
        dry_run: bool,
    },
}
