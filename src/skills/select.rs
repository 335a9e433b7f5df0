//! Skill selection: pick the subset of the catalog relevant to one job.
//!
//! Three modes:
//! - `none`: empty selection, never errors.
//! - `explicit`: requested names must each match a catalog entry; duplicates
//!   across origins prefer `repo` and emit a warning; all missing names are
//!   combined into a single error.
//! - `auto`: keyword-overlap scoring between the task text and each entry's
//!   name/description; zero matches is an empty selection with a warning,
//!   not an error.
//!
//! Callers must treat a non-empty `errors` list, not entry count, as the
//! failure signal: explicit selection returns already-resolved matches even
//! when some names are missing.

use super::{SkillEntry, SkillOrigin};
use crate::delegation::SkillsMode;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Inputs to one selection pass.
#[derive(Debug, Clone)]
pub struct SelectOptions<'a> {
    pub mode: SkillsMode,
    /// Task text scored against in `auto` mode.
    pub task: &'a str,
    /// Names requested in `explicit` mode.
    pub requested: &'a [String],
    /// Maximum entries returned in `auto` mode.
    pub max_skills: usize,
}

/// Outcome of a selection pass.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub selected: Vec<SkillEntry>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Select skills from a catalog snapshot.
pub fn select_skills(catalog: &[SkillEntry], options: &SelectOptions) -> Selection {
    match options.mode {
        SkillsMode::None => Selection::default(),
        SkillsMode::Explicit => select_explicit(catalog, options),
        SkillsMode::Auto => select_auto(catalog, options),
    }
}

fn select_explicit(catalog: &[SkillEntry], options: &SelectOptions) -> Selection {
    let requested: Vec<&str> = options
        .requested
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if requested.is_empty() {
        return Selection {
            selected: Vec::new(),
            warnings: Vec::new(),
            errors: vec!["skills_mode=explicit requires a non-empty skills list".to_string()],
        };
    }

    let mut by_name: HashMap<String, Vec<&SkillEntry>> = HashMap::new();
    for skill in catalog {
        by_name
            .entry(skill.name.trim().to_lowercase())
            .or_default()
            .push(skill);
    }

    let mut selected: Vec<SkillEntry> = Vec::new();
    let mut seen: HashSet<(SkillOrigin, &std::path::Path)> = HashSet::new();
    let mut warnings = Vec::new();
    let mut missing = Vec::new();

    for req in requested {
        let mut matches = by_name
            .get(&req.to_lowercase())
            .cloned()
            .unwrap_or_default();
        if matches.is_empty() {
            missing.push(req.to_string());
            continue;
        }

        matches.sort_by(|a, b| stable_order(a, b));
        let chosen = matches[0];
        if matches.len() > 1 {
            let discarded: Vec<String> = matches[1..]
                .iter()
                .map(|s| format!("{}:{} ({})", s.origin, s.name, s.path.display()))
                .collect();
            warnings.push(format!(
                "multiple skills matched \"{}\"; selected {}:{} ({}), discarded {}",
                req,
                chosen.origin,
                chosen.name,
                chosen.path.display(),
                discarded.join(", ")
            ));
        }

        // selected_skills never carries duplicate (origin, path) pairs.
        if seen.insert((chosen.origin, chosen.path.as_path())) {
            selected.push(chosen.clone());
        }
    }

    let errors = if missing.is_empty() {
        Vec::new()
    } else {
        vec![format!("missing requested skills: {}", missing.join(", "))]
    };

    Selection {
        selected,
        warnings,
        errors,
    }
}

fn select_auto(catalog: &[SkillEntry], options: &SelectOptions) -> Selection {
    let task = options.task.trim();
    if task.is_empty() {
        return Selection {
            selected: Vec::new(),
            warnings: Vec::new(),
            errors: vec!["skills_mode=auto requires a non-empty task".to_string()],
        };
    }

    let task_tokens: HashSet<String> = tokenize(task).collect();

    let mut scored: Vec<(u32, &SkillEntry)> = catalog
        .iter()
        .map(|skill| (score_skill(&task_tokens, skill), skill))
        .filter(|(score, _)| *score > 0)
        .collect();

    if scored.is_empty() {
        return Selection {
            selected: Vec::new(),
            warnings: vec![
                "no skills matched task keywords; selected_skills is empty \
                 (use skills_mode=explicit to force selection)"
                    .to_string(),
            ],
            errors: Vec::new(),
        };
    }

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b.cmp(score_a).then_with(|| stable_order(a, b))
    });

    Selection {
        selected: scored
            .into_iter()
            .take(options.max_skills)
            .map(|(_, skill)| skill.clone())
            .collect(),
        warnings: Vec::new(),
        errors: Vec::new(),
    }
}

/// 3 points per task token found in the name, 1 per token in the description.
fn score_skill(task_tokens: &HashSet<String>, skill: &SkillEntry) -> u32 {
    let mut score = 0;
    for token in tokenize(&skill.name) {
        if task_tokens.contains(&token) {
            score += 3;
        }
    }
    if let Some(description) = &skill.description {
        for token in tokenize(description) {
            if task_tokens.contains(&token) {
                score += 1;
            }
        }
    }
    score
}

/// Lowercase, split on non-alphanumeric runs, drop tokens shorter than 3.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Repo before global, then name, then path.
fn stable_order(a: &SkillEntry, b: &SkillEntry) -> Ordering {
    a.origin
        .cmp(&b.origin)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.path.cmp(&b.path))
}
