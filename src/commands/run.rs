//! Implementation of the `delegator run` command.

use super::{build_request, print_json};
use crate::cli::RunArgs;
use crate::config::DelegatorConfig;
use crate::delegation::{AutopilotOptions, RunStatus, run_autopilot};
use crate::error::Result;
use crate::exit_codes;

/// Execute one autopilot run and print the full run record.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = DelegatorConfig::from_env();
    let request = build_request(args.request);

    let output = run_autopilot(&config, &request, &AutopilotOptions::default())?;
    print_json(&output)?;

    Ok(match output.status {
        RunStatus::Completed => exit_codes::SUCCESS,
        RunStatus::Failed => exit_codes::RUN_FAILED,
        RunStatus::Cancelled => exit_codes::RUN_CANCELLED,
    })
}
