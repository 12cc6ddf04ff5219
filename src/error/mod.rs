//! Error handling module for framepipe

use thiserror::Error;

use crate::engine::DiagnosticLog;

/// Main error type for framepipe operations
///
/// One invocation produces at most one of these. When several failures are
/// detected at once the coordinator reports the dominant one:
/// `Cancelled` > pipe flow error > non-zero exit.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The external executable could not be started
    #[error("failed to launch {executable}: {source}")]
    Launch {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The stdin pipe broke while frames were being sent
    ///
    /// Carries the number of frames fully flushed before the failure. Not
    /// retried: a broken pipe means the downstream process already exited
    /// or rejected its input.
    #[error("pipe write failed after {frames_written} frame(s): {source}")]
    WriteFailure {
        frames_written: u64,
        #[source]
        source: std::io::Error,
    },

    /// The stdout pipe ended mid-frame on the decode side
    #[error(
        "stream truncated after {frames_read} frame(s) with {trailing_bytes} trailing byte(s)"
    )]
    TruncatedStream {
        frames_read: u64,
        trailing_bytes: usize,
    },

    /// The process exited with a non-zero status
    ///
    /// Exit codes alone are not descriptive; the captured diagnostic log
    /// carries the tool's human-readable reason.
    #[error("process exited with code {exit_code}:\n{log}")]
    ExecutionFailed { exit_code: i32, log: DiagnosticLog },

    /// The caller requested cancellation
    #[error("invocation cancelled")]
    Cancelled,

    /// Frame buffer length does not match width x height x bytes-per-pixel
    #[error(
        "frame buffer is {actual} byte(s), expected {expected} for {width}x{height} {format}"
    )]
    FrameSize {
        format: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Pixel format tag outside the supported set
    #[error("unknown pixel format: {0}")]
    UnknownPixelFormat(String),

    /// I/O error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant failure (task join, poisoned state)
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Frames successfully moved through the pipe before this error, if the
    /// variant tracks partial progress
    pub fn partial_frames(&self) -> Option<u64> {
        match self {
            EngineError::WriteFailure { frames_written, .. } => Some(*frames_written),
            EngineError::TruncatedStream { frames_read, .. } => Some(*frames_read),
            _ => None,
        }
    }
}

/// Result type alias for framepipe operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
