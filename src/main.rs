//! Delegator: route natural-language tasks to sandboxed codex agents.
//!
//! This is the main entry point for the `delegator` CLI. It parses
//! arguments, dispatches to the appropriate command handler, and maps both
//! errors and run outcomes to exit codes.

mod cli;
mod commands;
pub mod cancel;
pub mod codex;
pub mod config;
pub mod delegation;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod rundir;
pub mod skills;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
