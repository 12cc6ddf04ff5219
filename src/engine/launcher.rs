//! Process launcher
//!
//! Starts the external executable with all three standard handles redirected
//! to pipes. Each pipe has exactly one owner for the lifetime of the
//! invocation; the `Child` handle stays with the coordinator.

use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// A launched child process with its pipe channels
///
/// The pipes are `Option`s so each can be taken exactly once by the task
/// that owns it; the coordinator keeps the `Child` for exit and kill.
#[derive(Debug)]
pub struct PipeSet {
    pub child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

/// Spawn the external executable with piped standard handles
pub fn spawn_process(executable: &str, args: &[String]) -> EngineResult<PipeSet> {
    debug!(executable, ?args, "spawning transcoder process");

    let mut child = Command::new(executable)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::Launch {
            executable: executable.to_string(),
            source,
        })?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    debug!(pid = child.id(), "transcoder process started");

    Ok(PipeSet {
        child,
        stdin,
        stdout,
        stderr,
    })
}
