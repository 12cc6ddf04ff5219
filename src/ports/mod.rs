// Ports - Interface definitions (contracts)

use async_trait::async_trait;

use crate::engine::progress::ProgressUpdate;
use crate::error::EngineResult;
use crate::frame::Frame;

/// Port for lazy frame production
///
/// The engine consumes the sequence one frame at a time and never assumes an
/// upper bound on its length. A source may suspend (disk, network decoder);
/// that suspension never stalls the diagnostics drain, which runs on its own
/// task.
#[async_trait]
pub trait FrameSource: Send {
    /// Produce the next frame, or `None` when the sequence is exhausted
    async fn next_frame(&mut self) -> EngineResult<Option<Frame>>;
}

/// Adapter exposing any frame iterator as a `FrameSource`
///
/// Suits in-memory or generated bitmap sequences.
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Frame> + Send,
{
    /// Wrap an iterator of frames
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I> FrameSource for IterSource<I>
where
    I: Iterator<Item = Frame> + Send,
{
    async fn next_frame(&mut self) -> EngineResult<Option<Frame>> {
        Ok(self.inner.next())
    }
}

/// Port for command-line construction
///
/// The engine treats the returned tokens as opaque strings: no escaping, no
/// interpretation. Pipe markers (`-`, `pipe:0`, ...) are the builder's
/// responsibility.
pub trait ArgumentBuilder: Send + Sync {
    /// Produce the ordered token list for one invocation
    fn build(&self) -> Vec<String>;
}

/// Literal token list
pub struct StaticArgs(Vec<String>);

impl StaticArgs {
    /// Wrap an ordered list of pre-built tokens
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(tokens.into_iter().map(Into::into).collect())
    }
}

impl ArgumentBuilder for StaticArgs {
    fn build(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Port for progress observation
///
/// Optional: the core exposes the diagnostic log verbatim and mandates no
/// parsing. When a sink is installed, the drain feeds it every status line
/// it manages to parse.
pub trait ProgressSink: Send + Sync {
    /// Called for each parsed progress line, in production order
    fn on_progress(&self, update: ProgressUpdate);
}

/// Sink that discards all updates
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn on_progress(&self, _update: ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameSpec, PixelFormat};

    #[tokio::test]
    async fn iter_source_yields_in_order() {
        let spec = FrameSpec::new(1, 1, PixelFormat::Gray8).unwrap();
        let frames: Vec<Frame> = (0u8..3)
            .map(|i| Frame::new(spec, vec![i]).unwrap())
            .collect();
        let mut source = IterSource::new(frames.into_iter());

        for i in 0u8..3 {
            let frame = source.next_frame().await.unwrap().unwrap();
            assert_eq!(frame.data(), &[i]);
        }
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[test]
    fn static_args_preserve_order() {
        let args = StaticArgs::new(["-f", "rawvideo", "-i", "-"]);
        assert_eq!(args.build(), vec!["-f", "rawvideo", "-i", "-"]);
    }
}
