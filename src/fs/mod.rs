//! Filesystem helpers for run artifacts.
//!
//! Every JSON artifact a run produces is written atomically so that a
//! concurrent observer (another tool tailing the run directory) never sees a
//! partially written file.

mod atomic;

pub use atomic::{atomic_write, atomic_write_file};

use crate::error::{DelegatorError, Result};
use serde::Serialize;
use std::path::Path;

/// Atomically write a serializable value as pretty-printed JSON.
///
/// The payload is serialized with a trailing newline so artifacts are
/// friendly to `cat` and line-oriented diffing.
pub fn write_json_file<P: AsRef<Path>, T: Serialize>(path: P, payload: &T) -> Result<()> {
    let path = path.as_ref();
    let mut content =
        serde_json::to_string_pretty(payload).map_err(|e| DelegatorError::Serialization {
            artifact: path.display().to_string(),
            message: e.to_string(),
        })?;
    content.push('\n');
    atomic_write_file(path, &content)
}

/// Atomically write a text artifact (prompts, logs captured after the fact).
pub fn write_text_file<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    atomic_write_file(path, text)
}
