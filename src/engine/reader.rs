//! Pipe reader (decode direction)
//!
//! Reassembles fixed-size frames from the child's stdout. The OS pipe may
//! deliver fewer bytes than requested per read, so bytes accumulate until a
//! whole frame is available. Clean EOF at a frame boundary ends the
//! sequence; EOF mid-frame is a truncated stream.

use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::frame::{Frame, FrameSpec};

/// Outcome of the reader flow, captured for the coordinator
#[derive(Debug)]
pub struct ReaderOutcome {
    /// Frames fully reconstructed and delivered
    pub frames_read: u64,
    /// Flow error, if the reader stopped early
    pub error: Option<EngineError>,
}

/// Lazy, finite, non-restartable sequence of decoded frames
///
/// Backed by a bounded channel: when the caller stops pulling, the reader
/// task stops reading and the child blocks on its own stdout, so memory
/// stays bounded end to end.
pub struct FrameStream {
    rx: mpsc::Receiver<Frame>,
}

impl FrameStream {
    /// Next decoded frame, or `None` once the stream ends
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

/// Create the bounded channel pairing the reader task with a `FrameStream`
pub fn frame_channel(capacity: usize) -> (mpsc::Sender<Frame>, FrameStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, FrameStream { rx })
}

/// Read exact frame-sized blocks from `stdout` until EOF or cancellation
pub async fn read_frames(
    mut stdout: ChildStdout,
    spec: FrameSpec,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
) -> ReaderOutcome {
    let frame_len = spec.frame_len();
    let mut frames_read: u64 = 0;

    let error = 'outer: loop {
        if cancel.is_cancelled() {
            break Some(EngineError::Cancelled);
        }

        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;

        // Accumulate one frame across partial reads.
        while filled < frame_len {
            let read = stdout.read(&mut buf[filled..]);
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'outer Some(EngineError::Cancelled),
                n = read => match n {
                    Ok(n) => n,
                    Err(e) => break 'outer Some(EngineError::Io(e)),
                },
            };

            if n == 0 {
                if filled == 0 {
                    // EOF on a frame boundary: normal termination.
                    break 'outer None;
                }
                break 'outer Some(EngineError::TruncatedStream {
                    frames_read,
                    trailing_bytes: filled,
                });
            }
            filled += n;
        }

        let frame = match Frame::new(spec, buf) {
            Ok(frame) => frame,
            Err(e) => break Some(e),
        };

        // A closed receiver means the caller dropped the stream; stop
        // reading rather than buffer frames nobody will take.
        if tx.send(frame).await.is_err() {
            debug!(frames_read, "frame stream dropped by caller");
            break None;
        }
        frames_read += 1;
        trace!(frames_read, "frame reconstructed from stdout");
    };

    debug!(frames_read, stopped_early = error.is_some(), "pipe reader finished");
    ReaderOutcome { frames_read, error }
}
