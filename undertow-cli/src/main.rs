//! Undertow CLI - Command-line interface
//!
//! Populates a torrent client builder from arguments and reports the
//! resolved processing context.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use undertow_core::UndertowError;
use undertow_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "undertow")]
#[command(about = "Resolve torrent sources and plan piece selection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level; the log file always records everything
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the debug log file
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    if let Err(error) = commands::handle_command(cli.command).await {
        if let Some(error) = error.downcast_ref::<UndertowError>() {
            if error.is_user_error() {
                eprintln!("Error: {}", error.user_message());
                std::process::exit(2);
            }
        }
        return Err(error);
    }

    Ok(())
}
