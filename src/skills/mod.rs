//! Skill catalog: discovery and selection of SKILL.md documents.
//!
//! A "skill" is a named instructional document that can be attached to a
//! delegated job's prompt. Skills live in two places: a repo-scoped root
//! (the nearest ancestor `.codex/skills/` of the working directory) and a
//! global root (`<codex_home>/skills/`). Discovery builds a read-only
//! [`SkillIndex`] snapshot per top-level request; selection then picks a
//! subset per job.

mod discover;
mod frontmatter;
mod select;

pub use discover::{DiscoverOptions, discover_skills, find_nearest_repo_skills_root};
pub use frontmatter::{SkillFrontmatter, parse_frontmatter};
pub use select::{SelectOptions, Selection, select_skills};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Manifest filename that marks a skill directory.
pub const SKILL_MANIFEST: &str = "SKILL.md";

/// Where a skill was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillOrigin {
    /// Nearest ancestor `.codex/skills/` of the working directory.
    Repo,
    /// `<codex_home>/skills/`.
    Global,
}

impl std::fmt::Display for SkillOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillOrigin::Repo => write!(f, "repo"),
            SkillOrigin::Global => write!(f, "global"),
        }
    }
}

/// One discovered skill. Uniqueness is by `(origin, path)`, not by name:
/// the same name may exist in both origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Skill name from front-matter, or the parent directory name.
    pub name: String,

    /// Optional one-line description from front-matter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Which root the skill came from.
    pub origin: SkillOrigin,

    /// Absolute path of the SKILL.md manifest.
    pub path: PathBuf,
}

/// Discovery-time snapshot of all skills visible to one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillIndex {
    pub roots: SkillRoots,
    pub skills: Vec<SkillEntry>,
}

/// The roots that were actually found and scanned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillRoots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<PathBuf>,
}
