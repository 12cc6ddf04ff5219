//! Pipe writer (encode direction)
//!
//! Pulls frames from the source and writes their raw bytes to the child's
//! stdin in strict source order, flushing after every frame so memory stays
//! bounded. Closing stdin on the way out is the only end-of-input signal the
//! tool gets; omitting it would hang the process indefinitely.

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::ChildStdin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::EngineError;
use crate::ports::FrameSource;

/// Outcome of the writer flow, captured for the coordinator
#[derive(Debug)]
pub struct WriterOutcome {
    /// Frames fully flushed to the pipe
    pub frames_written: u64,
    /// Flow error, if the writer stopped early
    pub error: Option<EngineError>,
}

/// Stream every frame from `source` into `stdin`
///
/// Returns the number of frames flushed plus any captured error; the error
/// is captured rather than propagated so the coordinator alone decides the
/// reported outcome. stdin is closed on every path out of this function.
pub async fn write_frames(
    stdin: ChildStdin,
    mut source: Box<dyn FrameSource>,
    cancel: CancellationToken,
) -> WriterOutcome {
    let mut writer = BufWriter::new(stdin);
    let mut frames_written: u64 = 0;

    let error = loop {
        // Cancellation is checked at every iteration, and each pipe write
        // races the token so a full OS buffer cannot delay the stop.
        if cancel.is_cancelled() {
            break Some(EngineError::Cancelled);
        }

        let frame = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break None,
            Err(e) => break Some(e),
        };

        // The frame was validated at construction; re-check here so a
        // misbehaving source cannot desynchronize the raw stream.
        let expected = frame.spec().frame_len();
        if frame.data().len() != expected {
            let spec = frame.spec();
            break Some(EngineError::FrameSize {
                format: spec.format.tag().to_string(),
                width: spec.width,
                height: spec.height,
                expected,
                actual: frame.data().len(),
            });
        }

        let write = async {
            writer.write_all(frame.data()).await?;
            writer.flush().await
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Some(EngineError::Cancelled),
            result = write => result,
        };

        match result {
            Ok(()) => {
                frames_written += 1;
                trace!(frames_written, "frame flushed to stdin");
            }
            Err(source) => {
                // Broken pipe: the downstream process exited or rejected
                // input. Never retried.
                warn!(frames_written, error = %source, "stdin write failed");
                break Some(EngineError::WriteFailure {
                    frames_written,
                    source,
                });
            }
        }
        // frame dropped here, right after its bytes flush
    };

    // Dropping the writer closes the pipe and signals end-of-input.
    let mut stdin = writer.into_inner();
    let _ = stdin.shutdown().await;
    drop(stdin);

    debug!(frames_written, stopped_early = error.is_some(), "pipe writer finished");
    WriterOutcome {
        frames_written,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, FrameSpec, PixelFormat};
    use crate::ports::IterSource;

    fn frames(n: u8) -> Box<dyn FrameSource> {
        let spec = FrameSpec::new(2, 1, PixelFormat::Gray8).unwrap();
        let frames: Vec<Frame> = (0..n)
            .map(|i| Frame::new(spec, vec![i, i]).unwrap())
            .collect();
        Box::new(IterSource::new(frames.into_iter()))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn writes_all_frames_to_a_consuming_child() {
        use crate::engine::launcher::spawn_process;

        let mut pipes =
            spawn_process("sh", &["-c".to_string(), "cat > /dev/null".to_string()]).unwrap();
        let stdin = pipes.stdin.take().unwrap();

        let outcome = write_frames(stdin, frames(10), CancellationToken::new()).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.frames_written, 10);

        let status = pipes.child.wait().await.unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_token_stops_the_writer() {
        use crate::engine::launcher::spawn_process;

        let mut pipes =
            spawn_process("sh", &["-c".to_string(), "cat > /dev/null".to_string()]).unwrap();
        let stdin = pipes.stdin.take().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = write_frames(stdin, frames(10), cancel).await;
        assert!(matches!(outcome.error, Some(EngineError::Cancelled)));
        assert_eq!(outcome.frames_written, 0);
    }
}
