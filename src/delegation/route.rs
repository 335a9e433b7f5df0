//! Task routing: decide whether to delegate and build the phase plan.
//!
//! Classification is deliberately shallow — keyword regexes and character
//! counts, no language model. The thresholds are heuristic constants with
//! no documented derivation; they live in [`RouteThresholds`] so tests and
//! embedders can see them, and they are preserved as-is rather than tuned.

use super::{
    AutopilotRequest, Decision, Job, Plan, ReasoningDepth, SandboxMode, SkillsMode,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Informational openers that suggest a question rather than work.
static QUESTION_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(what|why|how|explain|describe|summarize)\b").expect("invalid question regex")
});

/// Action verbs that override question-word detection.
static ACTION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(add|implement|refactor|fix|update|create|build|ship|deploy|migrate)\b")
        .expect("invalid action verb regex")
});

/// Conjunctions counted as clause separators (commas are counted separately).
static CLAUSE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(and|then|also|plus|as well as)\b").expect("invalid clause regex")
});

/// The six fixed work categories and their keyword patterns.
static WORK_CATEGORIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("code", r"\b(add|implement|refactor|fix|update|create|build|rewrite|migrate)\b"),
        ("tests", r"\b(test|tests|coverage|jest|vitest|node:test)\b"),
        ("docs", r"\b(readme|docs?|documentation|agents\.md|contributing|runbook)\b"),
        ("research", r"\b(research|investigate|explore|compare|evaluate|best practices?)\b"),
        ("ops", r"\b(deploy|release|publish|version|ci|github actions|pipeline)\b"),
        ("security", r"\b(security|vuln|vulnerability|audit|permissions)\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("invalid category regex")))
    .collect()
});

/// Heuristic routing thresholds. Magic numbers preserved from the original
/// heuristics; do not re-derive.
#[derive(Debug, Clone, Copy)]
pub struct RouteThresholds {
    /// Task length (chars) that alone justifies delegation.
    pub delegate_task_len: usize,
    /// Category count that justifies delegation.
    pub delegate_categories: usize,
    /// Clause count that justifies delegation.
    pub delegate_clauses: usize,
    /// Task length pushing the implement job to high reasoning depth.
    pub high_task_len: usize,
    /// Clause count pushing the implement job to high reasoning depth.
    pub high_clauses: usize,
    /// Category count pushing the implement job to high reasoning depth.
    pub high_categories: usize,
}

impl Default for RouteThresholds {
    fn default() -> Self {
        RouteThresholds {
            delegate_task_len: 160,
            delegate_categories: 2,
            delegate_clauses: 2,
            high_task_len: 400,
            high_clauses: 4,
            high_categories: 3,
        }
    }
}

/// Decision plus plan for one request.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub decision: Decision,
    pub plan: Plan,
}

/// Classify a task and, when delegation is warranted, build the phase plan.
pub fn route_task(request: &AutopilotRequest) -> RouteResult {
    route_task_with(request, &RouteThresholds::default())
}

/// [`route_task`] with explicit thresholds.
pub fn route_task_with(request: &AutopilotRequest, thresholds: &RouteThresholds) -> RouteResult {
    let task = request.task.trim();

    if task.is_empty() {
        return no_delegation("empty task");
    }

    if is_question_like(task) {
        return no_delegation("informational question");
    }

    let clause_count = count_clauses(task);
    let categories = matched_categories(task);

    let long_task = task.len() >= thresholds.delegate_task_len;
    let cross_cutting = categories.len() >= thresholds.delegate_categories;
    let many_clauses = clause_count >= thresholds.delegate_clauses;

    if !long_task && !cross_cutting && !many_clauses {
        return no_delegation("single-scope task");
    }

    let mut reasons = Vec::new();
    if long_task {
        reasons.push("long task".to_string());
    }
    if cross_cutting {
        let names: Vec<&str> = categories.iter().copied().collect();
        reasons.push(format!("cross-cutting ({})", names.join(", ")));
    }
    if many_clauses {
        reasons.push("multiple clauses".to_string());
    }

    // The delegate condition guarantees at least one criterion matched.
    let reason = if reasons.is_empty() {
        "multi-step request".to_string()
    } else {
        reasons.join(", ")
    };

    RouteResult {
        decision: Decision {
            should_delegate: true,
            reason,
        },
        plan: Plan {
            jobs: build_jobs(request, thresholds, clause_count, &categories),
        },
    }
}

fn no_delegation(reason: &str) -> RouteResult {
    RouteResult {
        decision: Decision {
            should_delegate: false,
            reason: reason.to_string(),
        },
        plan: Plan::default(),
    }
}

/// A task reads as a question when it opens with an informational word and
/// contains no action verb implying concrete work. The verb check comes
/// second on purpose: action verbs override question-word detection.
fn is_question_like(task: &str) -> bool {
    let lower = task.to_lowercase();
    QUESTION_OPENER.is_match(&lower) && !ACTION_VERB.is_match(&lower)
}

/// Clause count: conjunction words plus commas.
fn count_clauses(task: &str) -> usize {
    let lower = task.to_lowercase();
    CLAUSE_WORD.find_iter(&lower).count() + lower.matches(',').count()
}

/// Which of the six work categories the task touches.
fn matched_categories(task: &str) -> BTreeSet<&'static str> {
    let lower = task.to_lowercase();
    WORK_CATEGORIES
        .iter()
        .filter(|(_, re)| re.is_match(&lower))
        .map(|(name, _)| *name)
        .collect()
}

/// The implement job runs at high depth for long, many-claused,
/// broadly-scoped, or security/research-flavored tasks.
fn implement_depth(
    task: &str,
    thresholds: &RouteThresholds,
    clause_count: usize,
    categories: &BTreeSet<&'static str>,
) -> ReasoningDepth {
    if task.len() >= thresholds.high_task_len
        || clause_count >= thresholds.high_clauses
        || categories.len() >= thresholds.high_categories
        || categories.contains("security")
        || categories.contains("research")
    {
        ReasoningDepth::High
    } else {
        ReasoningDepth::Medium
    }
}

const SCAN_TASK: &str = "Scan the repo quickly to identify the most relevant files and \
                         constraints. Return a short plan with file pointers and risks. \
                         Do not make code changes in this step.";

const VERIFY_TASK: &str = "Run relevant verification commands (tests, typecheck/lint, build) \
                           and report results. Do not make code changes; only report failures \
                           and their likely causes.";

fn build_jobs(
    request: &AutopilotRequest,
    thresholds: &RouteThresholds,
    clause_count: usize,
    categories: &BTreeSet<&'static str>,
) -> Vec<Job> {
    let max_agents = request.max_agents.max(1);
    let mut jobs = Vec::new();

    if max_agents >= 2 {
        jobs.push(Job {
            id: "scan".to_string(),
            title: "Repo scan + approach".to_string(),
            reasoning_depth: ReasoningDepth::Low,
            role: "specialist".to_string(),
            task: SCAN_TASK.to_string(),
            sandbox: SandboxMode::ReadOnly,
            model: None,
            config_overrides: Vec::new(),
            skills_mode: SkillsMode::Auto,
            skills: Vec::new(),
            max_skills: request.max_skills,
            include_repo_skills: request.include_repo_skills,
            include_global_skills: request.include_global_skills,
            skip_git_repo_check: request.skip_git_repo_check,
        });
    }

    jobs.push(Job {
        id: "implement".to_string(),
        title: "Implement requested change".to_string(),
        reasoning_depth: implement_depth(request.task.trim(), thresholds, clause_count, categories),
        role: request.role.clone(),
        task: request.task.clone(),
        sandbox: request.sandbox,
        model: request.model.clone(),
        config_overrides: request.config_overrides.clone(),
        skills_mode: request.skills_mode,
        skills: request.skills.clone(),
        max_skills: request.max_skills,
        include_repo_skills: request.include_repo_skills,
        include_global_skills: request.include_global_skills,
        skip_git_repo_check: request.skip_git_repo_check,
    });

    if max_agents >= 3 {
        jobs.push(Job {
            id: "verify".to_string(),
            title: "Verify via tests/lint/build".to_string(),
            reasoning_depth: ReasoningDepth::Low,
            role: "specialist".to_string(),
            task: VERIFY_TASK.to_string(),
            sandbox: SandboxMode::ReadOnly,
            model: None,
            config_overrides: Vec::new(),
            skills_mode: SkillsMode::None,
            skills: Vec::new(),
            max_skills: request.max_skills,
            include_repo_skills: request.include_repo_skills,
            include_global_skills: request.include_global_skills,
            skip_git_repo_check: request.skip_git_repo_check,
        });
    }

    jobs
}
