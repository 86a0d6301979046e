//! Registry command-line entry point.
//!
//! # Responsibility
//! - Load process configuration and open the registry database.
//! - Run maintenance commands against it.
//!
//! # Invariants
//! - Failures go to stderr and end the process with a non-zero exit code.

use chul_core::{
    init_logging, init_stderr_logging, open_db, refresh_export_view, run_bootstrap, AppConfig,
};
use clap::{Parser, Subcommand};
use log::error;
use std::error::Error;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "chul",
    about = "Maintenance commands for the community health unit registry",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load reference data fixtures into the registry
    Bootstrap,
    /// Rebuild the facilities export snapshot
    RefreshExport,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    match config.logging.log_dir.as_deref() {
        Some(dir) => init_logging(config.logging.level, &dir.to_string_lossy())?,
        None => init_stderr_logging(config.logging.level)?,
    }

    let conn = open_db(&config.database_path)?;
    match command {
        Command::Bootstrap => {
            run_bootstrap(&conn, &config.bootstrap)?;
            println!("Done loading");
        }
        Command::RefreshExport => {
            let rows = refresh_export_view(&conn)?;
            println!("Refreshed facilities export ({rows} rows)");
        }
    }
    Ok(())
}
