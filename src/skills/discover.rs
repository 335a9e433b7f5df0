//! Skill discovery: walk the filesystem and build a [`SkillIndex`].

use super::frontmatter::parse_frontmatter;
use super::{SKILL_MANIFEST, SkillEntry, SkillIndex, SkillOrigin, SkillRoots};
use crate::config::DelegatorConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoverOptions<'a> {
    /// Working directory the upward walk starts from.
    pub cwd: &'a Path,
    pub include_repo_skills: bool,
    pub include_global_skills: bool,
    /// Explicit repo root for tests; `None` means walk upward from `cwd`.
    pub repo_root_override: Option<PathBuf>,
    /// Explicit global root for tests; `None` means `<codex_home>/skills`.
    pub global_root_override: Option<PathBuf>,
}

impl<'a> DiscoverOptions<'a> {
    pub fn new(cwd: &'a Path) -> Self {
        DiscoverOptions {
            cwd,
            include_repo_skills: true,
            include_global_skills: true,
            repo_root_override: None,
            global_root_override: None,
        }
    }
}

/// Find the nearest ancestor directory containing `.codex/skills`.
pub fn find_nearest_repo_skills_root(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent()?.to_path_buf()
    };

    loop {
        let candidate = current.join(".codex").join("skills");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Discover all skills visible from a working directory.
///
/// Discovery never fails: unreadable directories and unparseable manifests
/// degrade rather than abort, and a missing root simply contributes no
/// entries.
pub fn discover_skills(config: &DelegatorConfig, options: &DiscoverOptions) -> SkillIndex {
    let repo_root = if options.include_repo_skills {
        options
            .repo_root_override
            .clone()
            .or_else(|| find_nearest_repo_skills_root(options.cwd))
            .filter(|root| root.is_dir())
    } else {
        None
    };

    let global_root = if options.include_global_skills {
        Some(
            options
                .global_root_override
                .clone()
                .unwrap_or_else(|| config.global_skills_root()),
        )
        .filter(|root| root.is_dir())
    } else {
        None
    };

    let mut skills = Vec::new();
    if let Some(root) = &repo_root {
        skills.extend(index_root(root, SkillOrigin::Repo));
    }
    if let Some(root) = &global_root {
        skills.extend(index_root(root, SkillOrigin::Global));
    }

    SkillIndex {
        roots: SkillRoots {
            repo: repo_root,
            global: global_root,
        },
        skills,
    }
}

/// Index one root: every `SKILL.md` below it, sorted by path for determinism.
fn index_root(root: &Path, origin: SkillOrigin) -> Vec<SkillEntry> {
    let mut manifests = Vec::new();
    collect_manifests(root, &mut manifests);
    manifests.sort();

    manifests
        .into_iter()
        .filter_map(|path| index_manifest(path, origin))
        .collect()
}

fn collect_manifests(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // Symlinks are skipped entirely to avoid cycles and surprise roots.
        if file_type.is_symlink() {
            continue;
        }

        let path = entry.path();
        if file_type.is_dir() {
            collect_manifests(&path, out);
        } else if file_type.is_file() && entry.file_name() == SKILL_MANIFEST {
            out.push(path);
        }
    }
}

/// Build one entry from a manifest, or `None` if it is excluded.
///
/// A manifest that cannot be read still yields a degraded entry (name from
/// the parent directory, no description); parse problems are non-fatal.
fn index_manifest(path: PathBuf, origin: SkillOrigin) -> Option<SkillEntry> {
    match fs::read_to_string(&path) {
        Ok(content) => {
            let front = parse_frontmatter(&content);
            if front.exclude {
                return None;
            }
            Some(SkillEntry {
                name: front.name.unwrap_or_else(|| fallback_name(&path)),
                description: front.description,
                origin,
                path,
            })
        }
        Err(_) => Some(SkillEntry {
            name: fallback_name(&path),
            description: None,
            origin,
            path,
        }),
    }
}

/// Name a skill after its immediate parent directory.
fn fallback_name(manifest_path: &Path) -> String {
    manifest_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, rel: &str, content: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SKILL_MANIFEST);
        fs::write(&path, content).unwrap();
        path
    }

    fn discover_with_roots(
        config: &DelegatorConfig,
        cwd: &Path,
        repo: Option<PathBuf>,
        global: Option<PathBuf>,
    ) -> SkillIndex {
        let mut options = DiscoverOptions::new(cwd);
        options.repo_root_override = repo;
        options.global_root_override = global;
        discover_skills(config, &options)
    }

    #[test]
    fn walks_upward_to_nearest_repo_root() {
        let temp_dir = TempDir::new().unwrap();
        let skills = temp_dir.path().join(".codex").join("skills");
        fs::create_dir_all(&skills).unwrap();

        let nested = temp_dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_nearest_repo_skills_root(&nested).unwrap();
        assert_eq!(found, skills);
    }

    #[test]
    fn nearest_root_wins_over_outer_root() {
        let temp_dir = TempDir::new().unwrap();
        let outer = temp_dir.path().join(".codex").join("skills");
        fs::create_dir_all(&outer).unwrap();

        let inner_base = temp_dir.path().join("project");
        let inner = inner_base.join(".codex").join("skills");
        fs::create_dir_all(&inner).unwrap();

        let cwd = inner_base.join("src");
        fs::create_dir_all(&cwd).unwrap();

        assert_eq!(find_nearest_repo_skills_root(&cwd).unwrap(), inner);
    }

    #[test]
    fn missing_root_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let index = discover_with_roots(&config, temp_dir.path(), None, None);
        assert!(index.roots.repo.is_none());
        assert!(index.roots.global.is_none());
        assert!(index.skills.is_empty());
    }

    #[test]
    fn indexes_both_origins_sorted_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let repo = temp_dir.path().join("repo-skills");
        write_skill(&repo, "zeta", "---\nname: zeta\n---\n");
        write_skill(&repo, "alpha", "---\nname: alpha\n---\n");

        let global = temp_dir.path().join("global-skills");
        write_skill(&global, "release", "---\nname: release\ndescription: ship it\n---\n");

        let index = discover_with_roots(
            &config,
            temp_dir.path(),
            Some(repo.clone()),
            Some(global.clone()),
        );

        assert_eq!(index.roots.repo.as_deref(), Some(repo.as_path()));
        assert_eq!(index.roots.global.as_deref(), Some(global.as_path()));

        let names: Vec<_> = index.skills.iter().map(|s| (s.origin, s.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (SkillOrigin::Repo, "alpha"),
                (SkillOrigin::Repo, "zeta"),
                (SkillOrigin::Global, "release"),
            ]
        );
    }

    #[test]
    fn falls_back_to_directory_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let repo = temp_dir.path().join("skills");
        write_skill(&repo, "review-checklist", "no front-matter here\n");

        let index = discover_with_roots(&config, temp_dir.path(), Some(repo), None);
        assert_eq!(index.skills.len(), 1);
        assert_eq!(index.skills[0].name, "review-checklist");
        assert_eq!(index.skills[0].description, None);
    }

    #[test]
    fn excluded_skills_are_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let repo = temp_dir.path().join("skills");
        write_skill(&repo, "visible", "---\nname: visible\n---\n");
        write_skill(&repo, "hidden", "---\nname: hidden\ndelegator_exclude: true\n---\n");

        let index = discover_with_roots(&config, temp_dir.path(), Some(repo), None);
        let names: Vec<_> = index.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["visible"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_manifests_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let repo = temp_dir.path().join("skills");
        let real = write_skill(&repo, "real", "---\nname: real\n---\n");

        let link_dir = repo.join("linked");
        fs::create_dir_all(&link_dir).unwrap();
        std::os::unix::fs::symlink(&real, link_dir.join(SKILL_MANIFEST)).unwrap();

        let index = discover_with_roots(&config, temp_dir.path(), Some(repo), None);
        assert_eq!(index.skills.len(), 1);
        assert_eq!(index.skills[0].name, "real");
    }

    #[test]
    fn disabled_origins_are_not_scanned() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path().join("home"));

        let repo = temp_dir.path().join("skills");
        write_skill(&repo, "one", "---\nname: one\n---\n");

        let mut options = DiscoverOptions::new(temp_dir.path());
        options.include_repo_skills = false;
        options.repo_root_override = Some(repo);
        let index = discover_skills(&config, &options);

        assert!(index.roots.repo.is_none());
        assert!(index.skills.is_empty());
    }
}
