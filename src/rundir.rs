//! Run directory creation and naming.
//!
//! Every top-level request gets a uniquely named directory under
//! `<codex_home>/delegator/runs/`, and each job a nested scope under
//! `subruns/<job_id>/`. Run directories are append-only from the engine's
//! point of view: artifacts are written incrementally as stages complete and
//! nothing is ever deleted here.

use crate::config::DelegatorConfig;
use crate::error::{DelegatorError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;

/// A freshly created run directory.
#[derive(Debug, Clone)]
pub struct RunDir {
    /// Unique, path-safe run identifier (also the directory name).
    pub run_id: String,

    /// Absolute path of the run directory.
    pub path: PathBuf,
}

impl RunDir {
    /// Create a new run directory under the configured runs root.
    pub fn create(config: &DelegatorConfig) -> Result<Self> {
        Self::create_with_id(config, generate_run_id(Utc::now()))
    }

    /// Create a run directory with an explicit id (tests, replays).
    pub fn create_with_id(config: &DelegatorConfig, run_id: String) -> Result<Self> {
        let path = config.runs_root().join(&run_id);
        fs::create_dir_all(&path).map_err(|e| {
            DelegatorError::UserError(format!(
                "failed to create run directory '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(RunDir { run_id, path })
    }

    /// Directory owned exclusively by one job of this run.
    pub fn subrun_dir(&self, job_id: &str) -> PathBuf {
        self.path.join("subruns").join(job_id)
    }
}

/// Generate a sortable run id: compact UTC timestamp plus 12 hex characters
/// of random entropy, e.g. `2026-08-25_142512123_9f8a2b77c01d`.
pub fn generate_run_id(now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y-%m-%d_%H%M%S%3f");
    let entropy = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", timestamp, &entropy[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_id_is_path_safe_and_unique() {
        let now = Utc::now();
        let a = generate_run_id(now);
        let b = generate_run_id(now);

        assert_ne!(a, b, "entropy suffix must differ");
        for id in [&a, &b] {
            assert!(
                id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "run id '{}' contains unsafe characters",
                id
            );
        }
    }

    #[test]
    fn run_id_embeds_timestamp() {
        let now = "2026-08-25T14:25:12.123Z".parse::<DateTime<Utc>>().unwrap();
        let id = generate_run_id(now);
        assert!(id.starts_with("2026-08-25_142512123_"), "got '{}'", id);
    }

    #[test]
    fn create_builds_nested_runs_root() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path());

        let run = RunDir::create(&config).unwrap();
        assert!(run.path.is_dir());
        assert!(run.path.starts_with(temp_dir.path().join("delegator").join("runs")));
    }

    #[test]
    fn subrun_dirs_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let config = DelegatorConfig::with_home(temp_dir.path());
        let run = RunDir::create(&config).unwrap();

        let scan = run.subrun_dir("scan");
        let verify = run.subrun_dir("verify");
        assert_ne!(scan, verify);
        assert!(scan.starts_with(&run.path));
    }
}
