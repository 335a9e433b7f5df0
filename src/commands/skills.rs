//! Implementation of the `delegator skills` command.

use super::print_json;
use crate::cli::SkillsArgs;
use crate::config::DelegatorConfig;
use crate::error::{DelegatorError, Result};
use crate::exit_codes;
use crate::skills::{DiscoverOptions, discover_skills};
use std::path::PathBuf;

/// Discover and print the skill catalog visible from a working directory.
pub fn cmd_skills(args: SkillsArgs) -> Result<i32> {
    let config = DelegatorConfig::from_env();
    let cwd = match args.cwd {
        Some(cwd) => PathBuf::from(cwd),
        None => std::env::current_dir().map_err(|e| {
            DelegatorError::UserError(format!("failed to resolve working directory: {}", e))
        })?,
    };

    let mut options = DiscoverOptions::new(&cwd);
    options.include_repo_skills = !args.no_repo_skills;
    options.include_global_skills = !args.no_global_skills;

    let index = discover_skills(&config, &options);
    print_json(&index)?;
    Ok(exit_codes::SUCCESS)
}
