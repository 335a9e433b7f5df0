//! Structured prompt composition for delegated agents.

use super::Job;
use crate::skills::SkillEntry;
use std::path::Path;

/// Compose the prompt one agent invocation receives on stdin.
///
/// The prompt names the role and working directory, carries the job task
/// verbatim, lists selected skills by path (with an explicit instruction not
/// to inline their bodies), forbids recursive delegation, and restates the
/// structured-output contract the agent must satisfy.
pub fn build_subagent_prompt(cwd: &Path, job: &Job, selected_skills: &[SkillEntry]) -> String {
    [
        format!("Role: {}", job.role),
        String::new(),
        format!("Working directory: {}", cwd.display()),
        String::new(),
        format!("Autopilot job: {} ({})", job.title, job.id),
        String::new(),
        "Task:".to_string(),
        job.task.clone(),
        String::new(),
        "Selected skills (read the SKILL.md at these paths; do not inline skill bodies):"
            .to_string(),
        skill_list(selected_skills),
        String::new(),
        "Recursion guard: do not call any delegate_* tools.".to_string(),
        String::new(),
        "Output requirements: return a single JSON object matching the provided output schema:"
            .to_string(),
        "- summary: string".to_string(),
        "- deliverables: { path: string, description: string }[]".to_string(),
        "- open_questions: string[]".to_string(),
        "- next_actions: string[]".to_string(),
        String::new(),
    ]
    .join("\n")
}

fn skill_list(selected: &[SkillEntry]) -> String {
    if selected.is_empty() {
        return "- (none)".to_string();
    }
    selected
        .iter()
        .map(|s| format!("- {} ({}) - {}", s.name, s.origin, s.path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
