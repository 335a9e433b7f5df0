//! Agent subprocess integration.
//!
//! This module owns the contract with the external `codex` binary: the
//! `exec` argv shape, the stdin prompt delivery, the structured-output
//! schema the subprocess must satisfy, the JSONL event stream, and the
//! `-c key=value` configuration override strings.

mod exec;
mod output;
mod overrides;

pub use exec::{ExecArtifacts, ExecOutcome, ExecRequest, run_exec, run_exec_resume};
pub use output::{
    Deliverable, SubagentOutput, read_subagent_output, subagent_output_schema,
};
pub use overrides::{build_config_overrides, has_override, toml_string};
