//! CLI argument parsing for the delegator.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::delegation::{SandboxMode, SkillsMode};
use clap::{Args, Parser, Subcommand};

/// Delegator: route natural-language tasks to sandboxed codex agents.
///
/// Each run is fully recorded under `<codex_home>/delegator/runs/<run_id>/`:
/// the routing decision, the phased plan, per-job prompts and event streams,
/// and the aggregated result.
#[derive(Parser, Debug)]
#[command(name = "delegator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Available commands for the delegator.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Route a task and execute the resulting plan.
    ///
    /// Prints the full run record as JSON. Exit code reflects the run
    /// status: 0 completed, 2 failed, 3 cancelled.
    Run(RunArgs),

    /// Show the routing decision and plan without executing anything.
    Route(RouteArgs),

    /// List the skills discoverable from a working directory.
    Skills(SkillsArgs),
}

/// Request fields shared by `run` and `route`.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Natural-language description of the desired work.
    pub task: String,

    /// Working directory for the agents (defaults to the current directory).
    #[arg(long)]
    pub cwd: Option<String>,

    /// Sandbox level for the implement job.
    #[arg(long, value_enum, default_value = "workspace-write")]
    pub sandbox: SandboxMode,

    /// Role line injected into agent prompts.
    #[arg(long, default_value = "specialist")]
    pub role: String,

    /// How skills are chosen for the implement job.
    #[arg(long, value_enum, default_value = "auto")]
    pub skills_mode: SkillsMode,

    /// Skill names for `explicit` mode.
    #[arg(long = "skill", value_delimiter = ',')]
    pub skills: Vec<String>,

    /// Maximum skills attached per job in `auto` mode.
    #[arg(long, default_value_t = 6)]
    pub max_skills: usize,

    /// Agent budget: scan appears at >= 2, verify at >= 3.
    #[arg(long, default_value_t = 3)]
    pub max_agents: usize,

    /// Concurrency cap for the read-only phases.
    #[arg(long, default_value_t = 2)]
    pub max_parallel: usize,

    /// Explicit model for the implement job.
    #[arg(long)]
    pub model: Option<String>,

    /// Raw `key=value` configuration override, forwarded verbatim.
    #[arg(short = 'c', long = "config")]
    pub config_overrides: Vec<String>,

    /// Skip repo-scoped skill discovery.
    #[arg(long)]
    pub no_repo_skills: bool,

    /// Skip global skill discovery.
    #[arg(long)]
    pub no_global_skills: bool,

    /// Pass `--skip-git-repo-check` to the agent binary.
    #[arg(long)]
    pub skip_git_repo_check: bool,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the `route` command.
#[derive(Args, Debug)]
pub struct RouteArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the `skills` command.
#[derive(Args, Debug)]
pub struct SkillsArgs {
    /// Working directory the repo-root walk starts from.
    #[arg(long)]
    pub cwd: Option<String>,

    /// Skip repo-scoped skill discovery.
    #[arg(long)]
    pub no_repo_skills: bool,

    /// Skip global skill discovery.
    #[arg(long)]
    pub no_global_skills: bool,
}
