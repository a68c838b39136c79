//! netsentry CLI
//!
//! Runs the pipeline stages from a YAML configuration. See
//! [`netsentry::cli`] for the commands.

use clap::Parser;
use netsentry::cli::{run_command, Cli};
use netsentry::context::init_tracing;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
