//! One invocation of the agent binary, with artifact capture and
//! cooperative cancellation.
//!
//! The subprocess contract:
//!
//! ```text
//! codex exec -C <cwd> --sandbox <level> --json --output-schema <schema>
//!     -o <last_message> [--skip-git-repo-check] [-c <override>]...
//!     [resume <session_id>] -
//! ```
//!
//! The prompt is written to stdin and the pipe closed — never passed as an
//! argument, to avoid length and escaping limits. Stdout is a
//! newline-delimited stream of JSON events, appended verbatim to
//! `events.jsonl` and scanned opportunistically for a session identifier.
//! Stderr is streamed to `stderr.log`.
//!
//! Classification of the run into completed/failed/cancelled is the
//! orchestrator's job; this module only records what happened.

use crate::cancel::CancelToken;
use crate::delegation::SandboxMode;
use crate::error::Result;
use crate::fs::write_json_file;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Grace window between the graceful termination signal and force-kill.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How often the wait loop polls for exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Session-identifier key spellings, in priority order.
const SESSION_KEYS: &[&str] = &[
    "thread_id",
    "threadId",
    "session_id",
    "sessionId",
    "conversation_id",
    "conversationId",
];

/// Key spellings searched inside a nested `thread` object.
const THREAD_KEYS: &[&str] = &["id", "thread_id", "session_id", "conversation_id"];

/// Inputs for one agent invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest<'a> {
    /// Directory owning all artifacts of this invocation.
    pub run_dir: &'a Path,
    /// Working directory handed to the agent via `-C`.
    pub cwd: &'a Path,
    pub sandbox: SandboxMode,
    pub skip_git_repo_check: bool,
    /// Free-text prompt, delivered via stdin.
    pub prompt: &'a str,
    /// Opaque `key=value` strings forwarded verbatim via `-c`.
    pub config_overrides: &'a [String],
    /// Agent binary name or path (`codex` in production, a stub in tests).
    pub codex_bin: &'a str,
    pub cancel: CancelToken,
}

/// Paths of the artifacts one invocation produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecArtifacts {
    pub subagent_output_schema_path: PathBuf,
    pub events_path: PathBuf,
    pub stderr_path: PathBuf,
    pub last_message_path: PathBuf,
    pub thread_path: PathBuf,
    pub result_path: PathBuf,
}

impl ExecArtifacts {
    fn for_run_dir(run_dir: &Path) -> Self {
        ExecArtifacts {
            subagent_output_schema_path: run_dir.join("subagent_output.schema.json"),
            events_path: run_dir.join("events.jsonl"),
            stderr_path: run_dir.join("stderr.log"),
            last_message_path: run_dir.join("last_message.json"),
            thread_path: run_dir.join("thread.json"),
            result_path: run_dir.join("result.json"),
        }
    }
}

/// Normalized record of one finished (or failed-to-start) invocation.
///
/// All fields are informational; `error` is set for spawn failures and
/// synthesized for non-zero exits that carried no other error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    /// Whether the cancel signal fired before the subprocess exited.
    pub cancelled: bool,
    pub exit_code: Option<i32>,
    /// Signal number that terminated the subprocess, if any (Unix).
    pub signal: Option<i32>,
    /// First session identifier observed in the event stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Session this run resumed, for resume invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    pub artifacts: ExecArtifacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run one fresh agent invocation.
pub fn run_exec(request: &ExecRequest) -> Result<ExecOutcome> {
    run_exec_internal(request, None)
}

/// Run an invocation that resumes a prior session.
pub fn run_exec_resume(request: &ExecRequest, session_id: &str) -> Result<ExecOutcome> {
    run_exec_internal(request, Some(session_id))
}

fn run_exec_internal(request: &ExecRequest, resume: Option<&str>) -> Result<ExecOutcome> {
    let started_at = Utc::now();
    let artifacts = ExecArtifacts::for_run_dir(request.run_dir);

    write_json_file(
        &artifacts.subagent_output_schema_path,
        &super::output::subagent_output_schema(),
    )?;

    let mut command = Command::new(request.codex_bin);
    command
        .args(build_args(request, &artifacts, resume))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let outcome = ExecOutcome {
                started_at,
                finished_at: Utc::now(),
                duration_ms: (Utc::now() - started_at).num_milliseconds(),
                cancelled: request.cancel.is_cancelled(),
                exit_code: None,
                signal: None,
                session_id: None,
                parent_session_id: resume.map(str::to_string),
                artifacts: artifacts.clone(),
                error: Some(format!(
                    "failed to spawn '{}': {}",
                    request.codex_bin, e
                )),
            };
            write_json_file(&artifacts.result_path, &outcome)?;
            return Ok(outcome);
        }
    };

    let session_id: Mutex<Option<String>> = Mutex::new(None);
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let wait = std::thread::scope(|scope| {
        if let Some(mut stdin) = stdin {
            let prompt = request.prompt;
            scope.spawn(move || {
                // The subprocess may exit before reading; a broken pipe here
                // is not an error worth recording.
                let _ = stdin.write_all(prompt.as_bytes());
            });
        }

        if let Some(stdout) = stdout {
            let events_path = &artifacts.events_path;
            let session_id = &session_id;
            scope.spawn(move || {
                stream_events(stdout, events_path, session_id);
            });
        }

        if let Some(stderr) = stderr {
            let stderr_path = &artifacts.stderr_path;
            scope.spawn(move || {
                if let Ok(mut log) = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(stderr_path)
                {
                    let mut stderr = stderr;
                    let _ = std::io::copy(&mut stderr, &mut log);
                }
            });
        }

        wait_with_cancel(&mut child, &request.cancel)
    });

    let finished_at = Utc::now();

    let (exit_code, signal) = match wait.status {
        Some(status) => (status.code(), exit_signal(&status)),
        None => (None, None),
    };
    let mut error = wait.error;

    // A non-zero exit with no other explanation still deserves an error
    // string; downstream layers key failure messages off this field.
    if error.is_none()
        && let Some(code) = exit_code
        && code != 0
    {
        error = Some(format!("codex exec exited with code {}", code));
    }

    let session_id = session_id.into_inner().unwrap_or_default();
    if let Some(id) = &session_id {
        write_json_file(
            &artifacts.thread_path,
            &serde_json::json!({ "session_id": id }),
        )?;
    }

    let outcome = ExecOutcome {
        started_at,
        finished_at,
        duration_ms: (finished_at - started_at).num_milliseconds(),
        cancelled: wait.cancelled,
        exit_code,
        signal,
        session_id,
        parent_session_id: resume.map(str::to_string),
        artifacts: artifacts.clone(),
        error,
    };

    write_json_file(&artifacts.result_path, &outcome)?;
    Ok(outcome)
}

fn build_args(request: &ExecRequest, artifacts: &ExecArtifacts, resume: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        "-C".to_string(),
        request.cwd.display().to_string(),
        "--sandbox".to_string(),
        request.sandbox.as_str().to_string(),
        "--json".to_string(),
        "--output-schema".to_string(),
        artifacts.subagent_output_schema_path.display().to_string(),
        "-o".to_string(),
        artifacts.last_message_path.display().to_string(),
    ];

    if request.skip_git_repo_check {
        args.push("--skip-git-repo-check".to_string());
    }

    for override_arg in request.config_overrides {
        args.push("-c".to_string());
        args.push(override_arg.clone());
    }

    if let Some(session_id) = resume {
        args.push("resume".to_string());
        args.push(session_id.to_string());
    }

    // "-" tells the agent to read the prompt from stdin.
    args.push("-".to_string());
    args
}

/// Append each stdout line to the event log and scan it for a session id.
///
/// Malformed lines still land in the log; they never abort the run.
fn stream_events(
    stdout: std::process::ChildStdout,
    events_path: &Path,
    session_id: &Mutex<Option<String>>,
) {
    let Ok(mut log) = OpenOptions::new().create(true).append(true).open(events_path) else {
        return;
    };

    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let _ = writeln!(log, "{}", line);

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<Value>(trimmed)
            && let Some(found) = extract_session_id(&event)
        {
            let mut guard = session_id.lock().unwrap_or_else(|p| p.into_inner());
            // First non-empty identifier wins and is immutable.
            if guard.is_none() {
                *guard = Some(found);
            }
        }
    }
}

/// Pull a session identifier out of one event, trying the top level, a
/// nested `data` object, and a nested `thread` object, in that order.
fn extract_session_id(event: &Value) -> Option<String> {
    fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }

    first_string(event, SESSION_KEYS)
        .or_else(|| event.get("data").and_then(|data| first_string(data, SESSION_KEYS)))
        .or_else(|| event.get("thread").and_then(|thread| first_string(thread, THREAD_KEYS)))
}

struct WaitResult {
    status: Option<std::process::ExitStatus>,
    cancelled: bool,
    error: Option<String>,
}

/// Wait for the subprocess, honoring the cancel signal.
///
/// On cancellation the child is sent a graceful termination signal
/// immediately and force-killed if still running after [`KILL_GRACE`].
fn wait_with_cancel(child: &mut Child, cancel: &CancelToken) -> WaitResult {
    let mut cancelled = false;
    let mut kill_deadline: Option<Instant> = None;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return WaitResult {
                    status: Some(status),
                    cancelled,
                    error: None,
                };
            }
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return WaitResult {
                    status: None,
                    cancelled,
                    error: Some(format!("failed to wait for subprocess: {}", e)),
                };
            }
        }

        if cancel.is_cancelled() && !cancelled {
            cancelled = true;
            terminate_gracefully(child);
            kill_deadline = Some(Instant::now() + KILL_GRACE);
        }

        if let Some(deadline) = kill_deadline
            && Instant::now() >= deadline
        {
            let _ = child.kill();
            kill_deadline = None;
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn terminate_gracefully(child: &Child) {
    // SAFETY: kill(2) with a valid pid and signal has no memory-safety
    // concerns; a stale pid returns ESRCH which we ignore.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(child: &Child) {
    // No graceful signal on this platform; the grace window still applies
    // before the explicit kill, which is the only termination available.
    let _ = child;
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extracts_top_level_ids_in_priority_order() {
        let event = serde_json::json!({
            "session_id": "sess-1",
            "thread_id": "thr-1",
        });
        assert_eq!(extract_session_id(&event).as_deref(), Some("thr-1"));
    }

    #[test]
    fn extracts_nested_data_and_thread_ids() {
        let event = serde_json::json!({ "data": { "threadId": "from-data" } });
        assert_eq!(extract_session_id(&event).as_deref(), Some("from-data"));

        let event = serde_json::json!({ "thread": { "id": "from-thread" } });
        assert_eq!(extract_session_id(&event).as_deref(), Some("from-thread"));
    }

    #[test]
    fn top_level_beats_nested_objects() {
        let event = serde_json::json!({
            "conversation_id": "top",
            "data": { "thread_id": "nested" },
        });
        assert_eq!(extract_session_id(&event).as_deref(), Some("top"));
    }

    #[test]
    fn empty_and_non_string_ids_are_skipped() {
        let event = serde_json::json!({ "thread_id": "", "session_id": 42 });
        assert_eq!(extract_session_id(&event), None);

        let event = serde_json::json!({ "type": "turn.started" });
        assert_eq!(extract_session_id(&event), None);
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable stub that plays the part of the agent binary.
        fn write_stub(dir: &Path, body: &str) -> String {
            let path = dir.join("codex-stub");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        fn request<'a>(
            run_dir: &'a Path,
            cwd: &'a Path,
            codex_bin: &'a str,
            cancel: CancelToken,
        ) -> ExecRequest<'a> {
            ExecRequest {
                run_dir,
                cwd,
                sandbox: SandboxMode::ReadOnly,
                skip_git_repo_check: false,
                prompt: "do the thing",
                config_overrides: &[],
                codex_bin,
                cancel,
            }
        }

        #[test]
        fn captures_events_and_session_id() {
            let temp_dir = TempDir::new().unwrap();
            let stub = write_stub(
                temp_dir.path(),
                r#"echo '{"type":"turn.started"}'
echo '{"type":"session.created","data":{"session_id":"sess-abc"}}'
echo '{"thread_id":"later-id"}'"#,
            );

            let run_dir = temp_dir.path().join("run");
            let outcome = run_exec(&request(
                &run_dir,
                temp_dir.path(),
                &stub,
                CancelToken::new(),
            ))
            .unwrap();

            assert_eq!(outcome.exit_code, Some(0));
            assert!(!outcome.cancelled);
            assert_eq!(outcome.error, None);
            // First identifier wins, even with later candidates.
            assert_eq!(outcome.session_id.as_deref(), Some("sess-abc"));

            let events = std::fs::read_to_string(&outcome.artifacts.events_path).unwrap();
            assert_eq!(events.lines().count(), 3);

            let thread: Value =
                serde_json::from_str(&std::fs::read_to_string(&outcome.artifacts.thread_path).unwrap())
                    .unwrap();
            assert_eq!(thread["session_id"], "sess-abc");

            // result.json round-trips into the same outcome.
            let reloaded: ExecOutcome = serde_json::from_str(
                &std::fs::read_to_string(&outcome.artifacts.result_path).unwrap(),
            )
            .unwrap();
            assert_eq!(reloaded.exit_code, outcome.exit_code);
            assert_eq!(reloaded.session_id, outcome.session_id);
        }

        #[test]
        fn delivers_prompt_via_stdin() {
            let temp_dir = TempDir::new().unwrap();
            let prompt_copy = temp_dir.path().join("prompt.txt");
            let stub = write_stub(
                temp_dir.path(),
                &format!("cat > {}", prompt_copy.display()),
            );

            let run_dir = temp_dir.path().join("run");
            run_exec(&request(&run_dir, temp_dir.path(), &stub, CancelToken::new())).unwrap();

            assert_eq!(std::fs::read_to_string(&prompt_copy).unwrap(), "do the thing");
        }

        #[test]
        fn malformed_event_lines_do_not_abort() {
            let temp_dir = TempDir::new().unwrap();
            let stub = write_stub(
                temp_dir.path(),
                r#"echo 'not json at all'
echo '{"session_id":"found-anyway"}'"#,
            );

            let run_dir = temp_dir.path().join("run");
            let outcome = run_exec(&request(
                &run_dir,
                temp_dir.path(),
                &stub,
                CancelToken::new(),
            ))
            .unwrap();

            assert_eq!(outcome.session_id.as_deref(), Some("found-anyway"));
            let events = std::fs::read_to_string(&outcome.artifacts.events_path).unwrap();
            assert!(events.contains("not json at all"));
        }

        #[test]
        fn nonzero_exit_synthesizes_error() {
            let temp_dir = TempDir::new().unwrap();
            let stub = write_stub(temp_dir.path(), "exit 3");

            let run_dir = temp_dir.path().join("run");
            let outcome = run_exec(&request(
                &run_dir,
                temp_dir.path(),
                &stub,
                CancelToken::new(),
            ))
            .unwrap();

            assert_eq!(outcome.exit_code, Some(3));
            assert_eq!(
                outcome.error.as_deref(),
                Some("codex exec exited with code 3")
            );
        }

        #[test]
        fn spawn_failure_is_captured_not_raised() {
            let temp_dir = TempDir::new().unwrap();
            let run_dir = temp_dir.path().join("run");

            let outcome = run_exec(&request(
                &run_dir,
                temp_dir.path(),
                "definitely-not-a-real-binary-xyz",
                CancelToken::new(),
            ))
            .unwrap();

            assert_eq!(outcome.exit_code, None);
            assert!(outcome.error.as_deref().unwrap().contains("failed to spawn"));
            // The result artifact is still written.
            assert!(outcome.artifacts.result_path.exists());
        }

        #[test]
        fn cancellation_terminates_gracefully() {
            let temp_dir = TempDir::new().unwrap();
            let stub = write_stub(temp_dir.path(), "sleep 30");

            let run_dir = temp_dir.path().join("run");
            let cancel = CancelToken::new();
            let canceller = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                canceller.cancel();
            });

            let start = Instant::now();
            let outcome = run_exec(&request(&run_dir, temp_dir.path(), &stub, cancel)).unwrap();

            assert!(outcome.cancelled);
            // SIGTERM ends the sleep long before the 2s force-kill window.
            assert!(start.elapsed() < Duration::from_secs(5));
            assert_eq!(outcome.signal, Some(libc::SIGTERM));
        }

        #[test]
        fn force_kill_fires_after_grace_window() {
            let temp_dir = TempDir::new().unwrap();
            // Ignore SIGTERM so only the force-kill can end the stub.
            let stub = write_stub(temp_dir.path(), "trap '' TERM\nsleep 30 &\nwait");

            let run_dir = temp_dir.path().join("run");
            let cancel = CancelToken::new();
            cancel.cancel();

            let start = Instant::now();
            let outcome = run_exec(&request(&run_dir, temp_dir.path(), &stub, cancel)).unwrap();

            assert!(outcome.cancelled);
            let elapsed = start.elapsed();
            assert!(elapsed >= KILL_GRACE, "killed too early: {:?}", elapsed);
            assert!(elapsed < Duration::from_secs(10), "kill never fired: {:?}", elapsed);
        }

        #[test]
        fn resume_passes_session_and_records_parent() {
            let temp_dir = TempDir::new().unwrap();
            let args_copy = temp_dir.path().join("args.txt");
            let stub = write_stub(
                temp_dir.path(),
                &format!("echo \"$@\" > {}\ncat > /dev/null", args_copy.display()),
            );

            let run_dir = temp_dir.path().join("run");
            let outcome = run_exec_resume(
                &request(&run_dir, temp_dir.path(), &stub, CancelToken::new()),
                "sess-parent",
            )
            .unwrap();

            assert_eq!(outcome.parent_session_id.as_deref(), Some("sess-parent"));
            let args = std::fs::read_to_string(&args_copy).unwrap();
            assert!(args.contains("resume sess-parent"));
            assert!(args.trim_end().ends_with('-'));
        }

        #[test]
        fn stderr_is_streamed_to_log() {
            let temp_dir = TempDir::new().unwrap();
            let stub = write_stub(temp_dir.path(), "echo 'warning: something' >&2");

            let run_dir = temp_dir.path().join("run");
            let outcome = run_exec(&request(
                &run_dir,
                temp_dir.path(),
                &stub,
                CancelToken::new(),
            ))
            .unwrap();

            let stderr = std::fs::read_to_string(&outcome.artifacts.stderr_path).unwrap();
            assert!(stderr.contains("warning: something"));
        }
    }
}
