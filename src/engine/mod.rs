//! Process pipe-streaming engine
//!
//! Launches the external transcoding executable, streams raw frames through
//! its standard pipes, drains its diagnostics, and reconciles everything
//! into one terminal result per invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

pub mod coordinator;
pub mod drain;
pub mod launcher;
pub mod progress;
pub mod reader;
pub mod writer;

pub use coordinator::{DecodeSession, Invocation, InvocationResult, InvocationState};
pub use reader::FrameStream;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path or name of the external executable
    pub executable: String,
    /// Grace period between end of cancellation and forced kill, in
    /// milliseconds. Expiry forces the kill; it is not an error.
    pub kill_grace_ms: u64,
    /// Decoded frames buffered between the pipe reader and the caller.
    /// Bounded so a slow consumer backpressures the child through the pipe.
    pub frame_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: "ffmpeg".to_string(),
            kill_grace_ms: 2_000,
            frame_channel_capacity: 4,
        }
    }
}

impl EngineConfig {
    /// Grace period as a `Duration`
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| EngineError::Internal(format!("bad config: {e}")))
    }
}

/// One line of text captured from the process's standard error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLine {
    /// Monotonic sequence number, assigned strictly in read order
    pub seq: u64,
    /// Line content, without the trailing newline
    pub text: String,
}

/// Ordered, append-only log of diagnostic lines for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    lines: Vec<DiagnosticLine>,
}

impl DiagnosticLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, assigning it the next sequence number
    pub fn push(&mut self, text: String) {
        let seq = self.lines.len() as u64;
        self.lines.push(DiagnosticLine { seq, text });
    }

    /// Captured lines, in production order
    pub fn lines(&self) -> &[DiagnosticLine] {
        &self.lines
    }

    /// Number of captured lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the process produced no diagnostic output
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text)?;
        }
        Ok(())
    }
}
