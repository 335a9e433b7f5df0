//! The autopilot orchestrator: one request in, one fully recorded run out.
//!
//! `run_autopilot` is the only entry point. It resolves the working
//! directory, creates the run directory, snapshots the skill catalog once,
//! routes the task into a decision and a phased plan, executes the plan
//! phase by phase through the job pool, and aggregates per-job results.
//! Every stage leaves a JSON artifact behind before the next stage starts,
//! so a run directory is inspectable even after a crash mid-run.
//!
//! Phase ordering is strict: `scan` jobs finish before any implement job
//! starts, and implement jobs finish before `verify` starts. Implement jobs
//! always run one at a time; the read-only phases use the request's
//! `max_parallel`.

use super::pool::{JobOutcome, run_jobs};
use super::prompt::build_subagent_prompt;
use super::route::route_task;
use super::{
    Aggregate, Artifact, AutopilotOutput, AutopilotRequest, Job, JobResult, JobStatus, Plan,
    RunStatus, Timing,
};
use crate::cancel::CancelToken;
use crate::codex::{
    ExecOutcome, ExecRequest, build_config_overrides, has_override, read_subagent_output, run_exec,
};
use crate::config::DelegatorConfig;
use crate::error::{DelegatorError, Result};
use crate::fs::{write_json_file, write_text_file};
use crate::rundir::RunDir;
use crate::skills::{DiscoverOptions, SelectOptions, SkillEntry, discover_skills, select_skills};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-job artifact filenames, in the order they are produced.
const JOB_ARTIFACTS: &[&str] = &[
    "request.json",
    "selected_skills.json",
    "subagent_prompt.txt",
    "subagent_output.schema.json",
    "events.jsonl",
    "stderr.log",
    "last_message.json",
    "thread.json",
    "result.json",
];

/// Top-level artifact filenames written into the run directory.
const RUN_ARTIFACTS: &[&str] = &[
    "request.json",
    "skills_index.json",
    "autopilot_decision.json",
    "autopilot_plan.json",
    "autopilot_aggregate.json",
];

/// Knobs that are not part of the request itself.
#[derive(Debug, Clone, Default)]
pub struct AutopilotOptions {
    /// Cooperative cancellation signal shared with the caller.
    pub cancel: CancelToken,
}

/// Execute one autopilot request end to end.
///
/// Returns `Err` only for boundary failures (empty task, unresolvable
/// working directory, unwritable run directory). Job-level failures never
/// abort the run; they are recorded in the returned [`JobResult`]s and
/// reflected in the run's `status` and `error`.
pub fn run_autopilot(
    config: &DelegatorConfig,
    request: &AutopilotRequest,
    options: &AutopilotOptions,
) -> Result<AutopilotOutput> {
    let started_at = Utc::now();

    if request.task.is_empty() {
        return Err(DelegatorError::UserError(
            "task must not be empty".to_string(),
        ));
    }

    let cwd = resolve_cwd(request)?;
    let run = RunDir::create(config)?;

    write_json_file(
        &run.path.join("request.json"),
        &json!({
            "tool": "delegate_autopilot",
            "received_at": started_at,
            "request": request,
        }),
    )?;

    // One catalog snapshot per run; every job selects from the same view.
    let index = discover_skills(
        config,
        &DiscoverOptions {
            cwd: &cwd,
            include_repo_skills: request.include_repo_skills,
            include_global_skills: request.include_global_skills,
            repo_root_override: None,
            global_root_override: None,
        },
    );
    write_json_file(&run.path.join("skills_index.json"), &index)?;

    let routed = route_task(request);
    let decision = routed.decision;
    let mut plan = routed.plan;
    enrich_plan(config, &mut plan);

    write_json_file(&run.path.join("autopilot_decision.json"), &decision)?;
    write_json_file(&run.path.join("autopilot_plan.json"), &plan)?;

    let mut results: HashMap<String, JobResult> = HashMap::new();
    if decision.should_delegate {
        for (slot, phase_jobs) in phase_partition(&plan).into_iter().enumerate() {
            if phase_jobs.is_empty() {
                continue;
            }
            // Implement jobs mutate the workspace and must not overlap.
            let parallel = if slot == 1 { 1 } else { request.max_parallel };

            let pool = run_jobs(&phase_jobs, parallel, &options.cancel, |_, job| {
                run_autopilot_job(config, &run, &cwd, &index.skills, job, &options.cancel)
                    .map_err(|e| e.to_string())
            });

            for (job, outcome) in phase_jobs.iter().zip(pool.outcomes) {
                let result = match outcome {
                    JobOutcome::Completed(result) => result,
                    JobOutcome::Failed(message) => failed_result(job, &run, message),
                    JobOutcome::Skipped => skipped_result(job, &run),
                };
                results.insert(result.job_id.clone(), result);
            }
        }
    }

    let job_results: Vec<JobResult> = plan
        .jobs
        .iter()
        .map(|job| {
            results
                .remove(&job.id)
                .unwrap_or_else(|| skipped_result(job, &run))
        })
        .collect();

    let aggregate = aggregate_results(&job_results);
    write_json_file(&run.path.join("autopilot_aggregate.json"), &aggregate)?;

    let cancelled = options.cancel.is_cancelled()
        || job_results.iter().any(|r| r.status == JobStatus::Cancelled);
    let failures: Vec<String> = job_results
        .iter()
        .filter(|r| r.status == JobStatus::Failed)
        .map(|r| {
            format!(
                "{}: {}",
                r.job_id,
                r.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    let (status, error) = if cancelled {
        (RunStatus::Cancelled, Some("cancelled".to_string()))
    } else if !failures.is_empty() {
        (RunStatus::Failed, Some(failures.join("; ")))
    } else {
        (RunStatus::Completed, None)
    };

    Ok(AutopilotOutput {
        run_id: run.run_id.clone(),
        run_dir: run.path.display().to_string(),
        decision,
        plan,
        jobs: job_results,
        aggregate,
        artifacts: named_artifacts(&run.path, RUN_ARTIFACTS),
        timing: Timing::since(started_at),
        status,
        error,
    })
}

fn resolve_cwd(request: &AutopilotRequest) -> Result<PathBuf> {
    match request.cwd.as_deref().map(str::trim) {
        Some(cwd) if !cwd.is_empty() => Ok(PathBuf::from(cwd)),
        _ => std::env::current_dir().map_err(|e| {
            DelegatorError::UserError(format!("failed to resolve working directory: {}", e))
        }),
    }
}

/// Fill in depth-derived model and reasoning-effort overrides.
///
/// Explicit settings always win: a job-level `model` beats the depth-derived
/// one, and a caller-provided `-c model=...` or `-c model_reasoning_effort=...`
/// suppresses the environment-derived value entirely.
fn enrich_plan(config: &DelegatorConfig, plan: &mut Plan) {
    for job in &mut plan.jobs {
        let model = job.model.clone().or_else(|| {
            if has_override(&job.config_overrides, "model") {
                None
            } else {
                config.model_for(job.reasoning_depth).map(str::to_string)
            }
        });
        let effort = if has_override(&job.config_overrides, "model_reasoning_effort") {
            None
        } else {
            config
                .reasoning_effort_for(job.reasoning_depth)
                .map(str::to_string)
        };

        job.config_overrides =
            build_config_overrides(model.as_deref(), &job.config_overrides, effort.as_deref());
        job.model = model;
    }
}

/// Split the plan into its three execution phases, preserving plan order
/// inside each. Phase membership is by job id; anything that is neither
/// `scan` nor `verify` belongs to the implement phase.
fn phase_partition(plan: &Plan) -> [Vec<&Job>; 3] {
    let mut phases: [Vec<&Job>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for job in &plan.jobs {
        let slot = match job.id.as_str() {
            "scan" => 0,
            "verify" => 2,
            _ => 1,
        };
        phases[slot].push(job);
    }
    phases
}

fn run_autopilot_job(
    config: &DelegatorConfig,
    run: &RunDir,
    cwd: &Path,
    catalog: &[SkillEntry],
    job: &Job,
    cancel: &CancelToken,
) -> Result<JobResult> {
    let started_at = Utc::now();
    let job_dir = run.subrun_dir(&job.id);
    std::fs::create_dir_all(&job_dir).map_err(|e| {
        DelegatorError::UserError(format!(
            "failed to create job directory '{}': {}",
            job_dir.display(),
            e
        ))
    })?;

    write_json_file(
        &job_dir.join("request.json"),
        &json!({
            "tool": "delegate_job",
            "received_at": started_at,
            "job": job,
        }),
    )?;

    let selection = select_skills(
        catalog,
        &SelectOptions {
            mode: job.skills_mode,
            task: &job.task,
            requested: &job.skills,
            max_skills: job.max_skills,
        },
    );
    write_json_file(
        &job_dir.join("selected_skills.json"),
        &json!({
            "mode": job.skills_mode,
            "max_skills": job.max_skills,
            "requested": job.skills,
            "selected": selection.selected,
            "warnings": selection.warnings,
            "errors": selection.errors,
        }),
    )?;

    // Selection errors fail the job before any subprocess is started.
    if !selection.errors.is_empty() {
        return Ok(JobResult {
            job_id: job.id.clone(),
            title: job.title.clone(),
            run_dir: job_dir.display().to_string(),
            session_id: None,
            selected_skills: selection.selected,
            summary: "Failed to select skills; codex exec was not started.".to_string(),
            deliverables: Vec::new(),
            open_questions: selection.warnings,
            next_actions: vec!["Fix the requested skill names and retry.".to_string()],
            artifacts: named_artifacts(&job_dir, &JOB_ARTIFACTS[..2]),
            timing: Timing::since(started_at),
            status: JobStatus::Failed,
            error: Some(selection.errors.join("; ")),
        });
    }

    let prompt = build_subagent_prompt(cwd, job, &selection.selected);
    write_text_file(&job_dir.join("subagent_prompt.txt"), &prompt)?;

    let outcome = run_exec(&ExecRequest {
        run_dir: &job_dir,
        cwd,
        sandbox: job.sandbox,
        skip_git_repo_check: job.skip_git_repo_check,
        prompt: &prompt,
        config_overrides: &job.config_overrides,
        codex_bin: &config.codex_bin,
        cancel: cancel.clone(),
    })?;

    let parsed = read_subagent_output(&job_dir);
    let (status, error) = classify(&outcome, parsed.is_some());

    let mut open_questions: Vec<String> = parsed
        .as_ref()
        .map(|p| p.open_questions.clone())
        .unwrap_or_default();
    open_questions.extend(selection.warnings);

    let mut next_actions = vec![format!(
        "Inspect run artifacts under {}",
        job_dir.display()
    )];
    if let Some(parsed) = &parsed {
        next_actions.extend(parsed.next_actions.iter().cloned());
    }

    Ok(JobResult {
        job_id: job.id.clone(),
        title: job.title.clone(),
        run_dir: job_dir.display().to_string(),
        session_id: outcome.session_id.clone(),
        selected_skills: selection.selected,
        summary: parsed
            .as_ref()
            .map(|p| p.summary.clone())
            .unwrap_or_else(|| format!("{} did not return structured output.", job.title)),
        deliverables: parsed.map(|p| p.deliverables).unwrap_or_default(),
        open_questions,
        next_actions,
        artifacts: named_artifacts(&job_dir, JOB_ARTIFACTS),
        timing: Timing::since(started_at),
        status,
        error,
    })
}

/// Map a finished invocation onto a job status.
///
/// Precedence: cancellation, then any recorded error (spawn failures and
/// synthesized non-zero-exit errors), then a non-zero exit, then whether a
/// valid structured output exists.
fn classify(outcome: &ExecOutcome, has_output: bool) -> (JobStatus, Option<String>) {
    if outcome.cancelled {
        return (JobStatus::Cancelled, Some("cancelled".to_string()));
    }
    if let Some(error) = &outcome.error {
        return (JobStatus::Failed, Some(error.clone()));
    }
    if let Some(code) = outcome.exit_code {
        if code != 0 {
            return (
                JobStatus::Failed,
                Some(format!("codex exec exited with code {}", code)),
            );
        }
    }
    if has_output {
        (JobStatus::Completed, None)
    } else {
        (
            JobStatus::Failed,
            Some("codex exec did not produce a valid last_message.json".to_string()),
        )
    }
}

/// Synthetic result for a job whose callback itself errored.
fn failed_result(job: &Job, run: &RunDir, message: String) -> JobResult {
    JobResult {
        job_id: job.id.clone(),
        title: job.title.clone(),
        run_dir: run.subrun_dir(&job.id).display().to_string(),
        session_id: None,
        selected_skills: Vec::new(),
        summary: "Autopilot job failed.".to_string(),
        deliverables: Vec::new(),
        open_questions: Vec::new(),
        next_actions: Vec::new(),
        artifacts: Vec::new(),
        timing: Timing::zero(Utc::now()),
        status: JobStatus::Failed,
        error: Some(message),
    }
}

/// Synthetic result for a job that was never started.
fn skipped_result(job: &Job, run: &RunDir) -> JobResult {
    JobResult {
        job_id: job.id.clone(),
        title: job.title.clone(),
        run_dir: run.subrun_dir(&job.id).display().to_string(),
        session_id: None,
        selected_skills: Vec::new(),
        summary: "Skipped due to cancellation.".to_string(),
        deliverables: Vec::new(),
        open_questions: Vec::new(),
        next_actions: Vec::new(),
        artifacts: Vec::new(),
        timing: Timing::zero(Utc::now()),
        status: JobStatus::Skipped,
        error: Some("cancelled".to_string()),
    }
}

/// Roll up per-job results: summaries become one line each, deliverables
/// concatenate, and follow-up lists dedupe on first occurrence.
fn aggregate_results(results: &[JobResult]) -> Aggregate {
    let mut lines = Vec::new();
    let mut deliverables = Vec::new();
    let mut open_questions: Vec<String> = Vec::new();
    let mut next_actions: Vec<String> = Vec::new();

    for result in results {
        lines.push(format!(
            "{} ({}): {}",
            result.title, result.status, result.summary
        ));
        deliverables.extend(result.deliverables.iter().cloned());
        for question in &result.open_questions {
            if !open_questions.contains(question) {
                open_questions.push(question.clone());
            }
        }
        for action in &result.next_actions {
            if !next_actions.contains(action) {
                next_actions.push(action.clone());
            }
        }
    }

    Aggregate {
        summary: if lines.is_empty() {
            "No delegation needed.".to_string()
        } else {
            lines.join("\n")
        },
        deliverables,
        open_questions,
        next_actions,
    }
}

fn named_artifacts(dir: &Path, names: &[&str]) -> Vec<Artifact> {
    names
        .iter()
        .map(|name| Artifact {
            name: name.to_string(),
            path: dir.join(name).display().to_string(),
        })
        .collect()
}
