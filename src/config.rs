//! Environment-derived configuration for the delegator.
//!
//! The core never reads process environment ambiently. Everything derived
//! from the environment is captured once into an immutable [`DelegatorConfig`]
//! at the edge (CLI or embedding server) and passed down explicitly, which
//! keeps the orchestrator testable without environment mutation.
//!
//! Recognized variables:
//! - `CODEX_HOME` — overrides the codex home directory (default `~/.codex`)
//! - `CODEX_AUTOPILOT_MODEL_{LOW,MEDIUM,HIGH}` — per-depth model override
//! - `CODEX_AUTOPILOT_REASONING_EFFORT_{LOW,MEDIUM,HIGH}` — per-depth
//!   reasoning effort override
//! - `CODEX_AUTOPILOT_REASONING_EFFORT` — default reasoning effort, applied
//!   only when the per-depth variable is absent

use crate::delegation::ReasoningDepth;
use std::env;
use std::path::PathBuf;

/// Immutable snapshot of everything the delegator takes from the environment.
#[derive(Debug, Clone)]
pub struct DelegatorConfig {
    /// Codex home directory (skills root, run directories).
    pub codex_home: PathBuf,

    /// Name or path of the agent binary to spawn. Defaults to `codex`;
    /// tests point this at a stub script.
    pub codex_bin: String,

    /// Per-depth model overrides, indexed low/medium/high.
    pub models: [Option<String>; 3],

    /// Per-depth reasoning-effort overrides, indexed low/medium/high.
    pub reasoning_efforts: [Option<String>; 3],

    /// Fallback reasoning effort when no per-depth override is set.
    pub default_reasoning_effort: Option<String>,
}

impl DelegatorConfig {
    /// Capture configuration from the process environment.
    pub fn from_env() -> Self {
        let codex_home = match env_nonempty("CODEX_HOME") {
            Some(home) => PathBuf::from(home),
            None => dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".codex"),
        };

        DelegatorConfig {
            codex_home,
            codex_bin: "codex".to_string(),
            models: [
                env_nonempty("CODEX_AUTOPILOT_MODEL_LOW"),
                env_nonempty("CODEX_AUTOPILOT_MODEL_MEDIUM"),
                env_nonempty("CODEX_AUTOPILOT_MODEL_HIGH"),
            ],
            reasoning_efforts: [
                env_nonempty("CODEX_AUTOPILOT_REASONING_EFFORT_LOW"),
                env_nonempty("CODEX_AUTOPILOT_REASONING_EFFORT_MEDIUM"),
                env_nonempty("CODEX_AUTOPILOT_REASONING_EFFORT_HIGH"),
            ],
            default_reasoning_effort: env_nonempty("CODEX_AUTOPILOT_REASONING_EFFORT"),
        }
    }

    /// Build a config rooted at an explicit codex home with no overrides.
    pub fn with_home<P: Into<PathBuf>>(codex_home: P) -> Self {
        DelegatorConfig {
            codex_home: codex_home.into(),
            codex_bin: "codex".to_string(),
            models: [None, None, None],
            reasoning_efforts: [None, None, None],
            default_reasoning_effort: None,
        }
    }

    /// Root directory holding one subdirectory per top-level run.
    pub fn runs_root(&self) -> PathBuf {
        self.codex_home.join("delegator").join("runs")
    }

    /// Global skills root (`<codex_home>/skills`).
    pub fn global_skills_root(&self) -> PathBuf {
        self.codex_home.join("skills")
    }

    /// Model override for a reasoning depth, if configured.
    pub fn model_for(&self, depth: ReasoningDepth) -> Option<&str> {
        self.models[depth_index(depth)].as_deref()
    }

    /// Reasoning-effort override for a depth: the per-depth variable wins,
    /// the default applies only when it is absent.
    pub fn reasoning_effort_for(&self, depth: ReasoningDepth) -> Option<&str> {
        self.reasoning_efforts[depth_index(depth)]
            .as_deref()
            .or(self.default_reasoning_effort.as_deref())
    }
}

fn depth_index(depth: ReasoningDepth) -> usize {
    match depth {
        ReasoningDepth::Low => 0,
        ReasoningDepth::Medium => 1,
        ReasoningDepth::High => 2,
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn with_home_sets_derived_paths() {
        let config = DelegatorConfig::with_home("/tmp/codex-home");
        assert_eq!(
            config.runs_root(),
            PathBuf::from("/tmp/codex-home/delegator/runs")
        );
        assert_eq!(
            config.global_skills_root(),
            PathBuf::from("/tmp/codex-home/skills")
        );
    }

    #[test]
    fn per_depth_effort_wins_over_default() {
        let mut config = DelegatorConfig::with_home("/tmp/x");
        config.default_reasoning_effort = Some("medium".to_string());
        config.reasoning_efforts[2] = Some("xhigh".to_string());

        assert_eq!(config.reasoning_effort_for(ReasoningDepth::High), Some("xhigh"));
        assert_eq!(config.reasoning_effort_for(ReasoningDepth::Low), Some("medium"));
    }

    #[test]
    fn model_lookup_is_per_depth() {
        let mut config = DelegatorConfig::with_home("/tmp/x");
        config.models[0] = Some("gpt-mini".to_string());

        assert_eq!(config.model_for(ReasoningDepth::Low), Some("gpt-mini"));
        assert_eq!(config.model_for(ReasoningDepth::High), None);
    }

    #[test]
    #[serial]
    fn from_env_reads_codex_home_and_overrides() {
        unsafe {
            env::set_var("CODEX_HOME", "/tmp/env-home");
            env::set_var("CODEX_AUTOPILOT_MODEL_HIGH", "gpt-5");
            env::set_var("CODEX_AUTOPILOT_REASONING_EFFORT", "  high  ");
            env::remove_var("CODEX_AUTOPILOT_REASONING_EFFORT_LOW");
        }

        let config = DelegatorConfig::from_env();
        assert_eq!(config.codex_home, PathBuf::from("/tmp/env-home"));
        assert_eq!(config.model_for(ReasoningDepth::High), Some("gpt-5"));
        // Trimmed default applies where no per-depth value exists.
        assert_eq!(config.reasoning_effort_for(ReasoningDepth::Low), Some("high"));

        unsafe {
            env::remove_var("CODEX_HOME");
            env::remove_var("CODEX_AUTOPILOT_MODEL_HIGH");
            env::remove_var("CODEX_AUTOPILOT_REASONING_EFFORT");
        }
    }

    #[test]
    #[serial]
    fn blank_env_values_are_ignored() {
        unsafe {
            env::set_var("CODEX_HOME", "   ");
        }
        let config = DelegatorConfig::from_env();
        assert!(config.codex_home.ends_with(".codex"));
        unsafe {
            env::remove_var("CODEX_HOME");
        }
    }
}
