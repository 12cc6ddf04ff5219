//! File-backed frame source
//!
//! Reads frame-sized chunks from a raw pixel file. This is the adapter the
//! CLI uses for encoding; applications with in-memory bitmaps implement
//! `FrameSource` directly instead.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::frame::{Frame, FrameSpec};
use crate::ports::FrameSource;

/// Frame source backed by a raw pixel file
pub struct RawFileSource {
    reader: BufReader<File>,
    spec: FrameSpec,
    frames_read: u64,
}

impl RawFileSource {
    /// Open a raw pixel file as a frame source
    pub async fn open(path: impl AsRef<Path>, spec: FrameSpec) -> EngineResult<Self> {
        let file = File::open(path.as_ref()).await?;
        debug!(
            path = %path.as_ref().display(),
            frame_len = spec.frame_len(),
            "opened raw frame file"
        );
        Ok(Self {
            reader: BufReader::new(file),
            spec,
            frames_read: 0,
        })
    }
}

#[async_trait]
impl FrameSource for RawFileSource {
    async fn next_frame(&mut self) -> EngineResult<Option<Frame>> {
        let frame_len = self.spec.frame_len();
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;

        // The file may be on slow storage; accumulate until a whole frame
        // is available or the file ends.
        while filled < frame_len {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < frame_len {
            return Err(EngineError::TruncatedStream {
                frames_read: self.frames_read,
                trailing_bytes: filled,
            });
        }

        self.frames_read += 1;
        Ok(Some(Frame::new(self.spec, buf)?))
    }
}
