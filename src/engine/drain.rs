//! Diagnostics drain
//!
//! Continuously reads the child's stderr line by line into an ordered log.
//! Runs on its own task for the whole invocation: a process whose stderr
//! buffer fills and is never drained can deadlock against its own
//! stdin/stdout. No line is dropped or reordered. The drain itself runs to
//! channel close; descendants of a killed child can keep the write end open
//! past the child's death, so the coordinator bounds the join on a
//! cancelled run instead of relying on EOF.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tracing::{debug, trace};

use crate::engine::progress::ProgressUpdate;
use crate::engine::DiagnosticLog;
use crate::ports::ProgressSink;

/// Drain stderr to channel close, returning the full ordered log
pub async fn drain_stderr(
    stderr: ChildStderr,
    progress: Option<Arc<dyn ProgressSink>>,
) -> DiagnosticLog {
    let mut lines = BufReader::new(stderr).lines();
    let mut log = DiagnosticLog::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!(seq = log.len(), line = %line, "stderr line");
                if let Some(sink) = &progress {
                    if let Some(update) = ProgressUpdate::parse(&line) {
                        sink.on_progress(update);
                    }
                }
                log.push(line);
            }
            // EOF and read errors both mean the channel is gone; the log
            // keeps whatever was captured up to that point.
            Ok(None) => break,
            Err(_) => break,
        }
    }

    debug!(lines = log.len(), "diagnostics drain finished");
    log
}
