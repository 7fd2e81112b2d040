//! hotelc CLI Binary
//!
//! Command-line interface for checking telemetry configuration and driving a
//! synthetic session through the engine.

use std::process;

use clap::Parser;
use hotelc::cli::{map_error, Cli, RunContext};
use hotelc::logging::{init_logging, LoggingConfig};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Configuration errors are reported after logging is up.
    let context = RunContext::new(cli.config.clone());

    let logging_config = build_logging_config(
        &cli,
        context.as_ref().ok().map(|c| c.config().logging.clone()),
    );
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("hotelc starting");

    let context = match context {
        Ok(context) => context,
        Err(e) => {
            error!("Error loading configuration: {:#}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI flags over the loaded config file.
fn build_logging_config(cli: &Cli, loaded: Option<LoggingConfig>) -> LoggingConfig {
    let mut config = loaded.unwrap_or_default();
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    config
}
