//! csvlite CLI - Main entry point

use colored::Colorize;
use csvlite_cli::config::Config;
use csvlite_cli::{Cli, Commands};
use csvlite_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Warnings only, unless verbose; stdout stays reserved for results
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("csvlite")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {}", e);
            log_config
        },
    };

    // The CLI works without logging
    let guard = init_logging(&log_config).unwrap_or_else(|e| {
        eprintln!("Warning: logging disabled: {}", e);
        None
    });

    let result = match Config::from_env() {
        Ok(config) => execute_command(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        // process::exit skips destructors; flush file logs first
        drop(guard);
        process::exit(e.exit_code());
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli, config: Config) -> csvlite_cli::Result<()> {
    match cli.command {
        Commands::Convert(args) => csvlite_cli::commands::convert::run(args, config).await,
        Commands::Types => csvlite_cli::commands::types::run(),
    }
}
