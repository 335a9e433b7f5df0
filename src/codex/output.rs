//! Structured-output contract for delegated agents.
//!
//! Each agent invocation receives a JSON Schema describing the shape its
//! final message must satisfy, and writes that message to
//! `last_message.json` in its run directory. The orchestrator reads it back
//! with [`read_subagent_output`]; any read or validation failure is treated
//! as "no output produced", never as a hard error.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

/// A file the agent produced or changed, with a one-line description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deliverable {
    pub path: String,
    pub description: String,
}

/// The structured final message every delegated agent must return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubagentOutput {
    pub summary: String,
    pub deliverables: Vec<Deliverable>,
    pub open_questions: Vec<String>,
    pub next_actions: Vec<String>,
}

/// JSON Schema (2020-12) the agent binary validates its final message
/// against. Written to `subagent_output.schema.json` before each spawn.
pub fn subagent_output_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "additionalProperties": false,
        "required": ["summary", "deliverables", "open_questions", "next_actions"],
        "properties": {
            "summary": { "type": "string" },
            "deliverables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["path", "description"],
                    "properties": {
                        "path": { "type": "string" },
                        "description": { "type": "string" }
                    }
                }
            },
            "open_questions": { "type": "array", "items": { "type": "string" } },
            "next_actions": { "type": "array", "items": { "type": "string" } }
        }
    })
}

/// Read and validate `last_message.json` from a job run directory.
///
/// Returns `None` for a missing file, unreadable content, or a message that
/// does not satisfy the contract — all equivalent downstream.
pub fn read_subagent_output(run_dir: &Path) -> Option<SubagentOutput> {
    let raw = std::fs::read_to_string(run_dir.join("last_message.json")).ok()?;
    serde_json::from_str(&raw).ok()
}
