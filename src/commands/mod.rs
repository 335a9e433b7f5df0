//! Command implementations for the delegator CLI.
//!
//! The dispatcher routes parsed commands to their handlers. Handlers print
//! JSON to stdout and return the process exit code, so `run` can distinguish
//! a failed delegation from a CLI error.

mod route;
mod run;
mod skills;

use crate::cli::{Command, RequestArgs};
use crate::delegation::AutopilotRequest;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Route(args) => route::cmd_route(args),
        Command::Skills(args) => skills::cmd_skills(args),
    }
}

/// Build the engine request from parsed CLI arguments.
fn build_request(args: RequestArgs) -> AutopilotRequest {
    let mut request = AutopilotRequest::new(args.task);
    request.cwd = args.cwd;
    request.sandbox = args.sandbox;
    request.role = args.role;
    request.skills_mode = args.skills_mode;
    request.skills = args.skills;
    request.max_skills = args.max_skills;
    request.max_agents = args.max_agents;
    request.max_parallel = args.max_parallel;
    request.model = args.model;
    request.config_overrides = args.config_overrides;
    request.include_repo_skills = !args.no_repo_skills;
    request.include_global_skills = !args.no_global_skills;
    request.skip_git_repo_check = args.skip_git_repo_check;
    request
}

/// Serialize a value as pretty JSON for stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| {
        crate::error::DelegatorError::Serialization {
            artifact: "stdout".to_string(),
            message: e.to_string(),
        }
    })?;
    println!("{}", rendered);
    Ok(())
}
