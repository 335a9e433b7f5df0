//! Delegation engine: request/plan/result types, routing, bounded execution,
//! and the autopilot orchestrator.
//!
//! The flow is: [`autopilot::run_autopilot`] asks [`route`] for a
//! [`Decision`] and a [`Plan`] of phase jobs, then executes the plan phase
//! by phase through [`pool::run_jobs`], feeding each job through skill
//! selection and the agent process runner, and finally aggregates per-job
//! results into one [`Aggregate`].

pub mod autopilot;
pub mod pool;
pub mod prompt;
pub mod route;

pub use autopilot::{AutopilotOptions, run_autopilot};
pub use pool::{JobOutcome, PoolResult, run_jobs};
pub use route::{RouteResult, RouteThresholds, route_task};

use crate::codex::Deliverable;
use crate::skills::SkillEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sandbox permission level passed through to the agent subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum SandboxMode {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl SandboxMode {
    /// The exact token the agent binary expects for `--sandbox`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxMode::ReadOnly => "read-only",
            SandboxMode::WorkspaceWrite => "workspace-write",
            SandboxMode::DangerFullAccess => "danger-full-access",
        }
    }
}

/// How skills are chosen for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum SkillsMode {
    /// Keyword-score against the task text.
    Auto,
    /// Caller names the skills; missing names are errors.
    Explicit,
    /// No skills attached.
    None,
}

/// Reasoning-depth hint attached to each planned job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningDepth {
    Low,
    Medium,
    High,
}

/// A top-level delegation request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotRequest {
    /// Natural-language description of the desired work.
    pub task: String,

    /// Working directory for the agents; defaults to the process cwd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(default = "defaults::sandbox")]
    pub sandbox: SandboxMode,

    #[serde(default = "defaults::role")]
    pub role: String,

    #[serde(default = "defaults::skills_mode")]
    pub skills_mode: SkillsMode,

    /// Skill names for `explicit` mode.
    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default = "defaults::max_skills")]
    pub max_skills: usize,

    #[serde(default = "defaults::yes")]
    pub include_repo_skills: bool,

    #[serde(default = "defaults::yes")]
    pub include_global_skills: bool,

    #[serde(default)]
    pub skip_git_repo_check: bool,

    /// Budget of agents the plan may use (scan/verify appear at >= 2 / >= 3).
    #[serde(default = "defaults::max_agents")]
    pub max_agents: usize,

    /// Concurrency cap for the read-only phases.
    #[serde(default = "defaults::max_parallel")]
    pub max_parallel: usize,

    /// Explicit model for the implement job; wins over depth-derived models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Opaque `key=value` configuration overrides forwarded verbatim.
    #[serde(default)]
    pub config_overrides: Vec<String>,
}

impl AutopilotRequest {
    /// A request with the documented defaults.
    pub fn new<S: Into<String>>(task: S) -> Self {
        AutopilotRequest {
            task: task.into(),
            cwd: None,
            sandbox: defaults::sandbox(),
            role: defaults::role(),
            skills_mode: defaults::skills_mode(),
            skills: Vec::new(),
            max_skills: defaults::max_skills(),
            include_repo_skills: true,
            include_global_skills: true,
            skip_git_repo_check: false,
            max_agents: defaults::max_agents(),
            max_parallel: defaults::max_parallel(),
            model: None,
            config_overrides: Vec::new(),
        }
    }
}

mod defaults {
    use super::{SandboxMode, SkillsMode};

    pub fn sandbox() -> SandboxMode {
        SandboxMode::WorkspaceWrite
    }
    pub fn role() -> String {
        "specialist".to_string()
    }
    pub fn skills_mode() -> SkillsMode {
        SkillsMode::Auto
    }
    pub fn max_skills() -> usize {
        6
    }
    pub fn max_agents() -> usize {
        3
    }
    pub fn max_parallel() -> usize {
        2
    }
    pub fn yes() -> bool {
        true
    }
}

/// The delegation decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub should_delegate: bool,
    pub reason: String,
}

/// One unit of delegated work, mapped to exactly one agent invocation.
///
/// Immutable value object produced by the router (or a caller). `id` is a
/// path-safe token used as the subrun directory name; phase membership
/// (`scan`/`implement`/`verify`) is determined by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub reasoning_depth: ReasoningDepth,
    pub role: String,
    pub task: String,
    pub sandbox: SandboxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_overrides: Vec<String>,
    pub skills_mode: SkillsMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    pub max_skills: usize,
    pub include_repo_skills: bool,
    pub include_global_skills: bool,
    pub skip_git_repo_check: bool,
}

/// Ordered list of jobs for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub jobs: Vec<Job>,
}

/// Wall-clock timing of a job or run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl Timing {
    /// Timing spanning `started_at` to now.
    pub fn since(started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        Timing {
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
        }
    }

    /// Zero-duration timing used for synthetic (skipped) results.
    pub fn zero(at: DateTime<Utc>) -> Self {
        Timing {
            started_at: at,
            finished_at: at,
            duration_ms: 0,
        }
    }
}

/// Terminal status of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Terminal status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// A named artifact path recorded in results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: String,
}

/// Terminal record for one planned job. Exactly one exists per planned job
/// after a run, including jobs that never executed (`skipped`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub title: String,
    pub run_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub selected_skills: Vec<SkillEntry>,
    pub summary: String,
    pub deliverables: Vec<Deliverable>,
    pub open_questions: Vec<String>,
    pub next_actions: Vec<String>,
    pub artifacts: Vec<Artifact>,
    pub timing: Timing,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cross-job rollup of summaries, deliverables, and follow-ups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub summary: String,
    pub deliverables: Vec<Deliverable>,
    pub open_questions: Vec<String>,
    pub next_actions: Vec<String>,
}

/// Everything a caller gets back from one autopilot run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotOutput {
    pub run_id: String,
    pub run_dir: String,
    pub decision: Decision,
    pub plan: Plan,
    pub jobs: Vec<JobResult>,
    pub aggregate: Aggregate,
    pub artifacts: Vec<Artifact>,
    pub timing: Timing,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
