//! Framepipe library
//!
//! Host-side orchestration for an external media-transcoding executable.
//! The engine launches the tool as a child process, streams raw frames
//! through its standard pipes in either direction, drains its diagnostic
//! output concurrently, and reports one structured result per invocation.
//!
//! Codec logic, container parsing, and binary distribution are out of
//! scope: the tool is driven purely through its command line and pipes.

pub mod cli;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ports;

// Re-export commonly used types
pub use engine::{
    DecodeSession, DiagnosticLine, DiagnosticLog, EngineConfig, FrameStream, Invocation,
    InvocationResult, InvocationState,
};
pub use error::{EngineError, EngineResult};
pub use frame::{Frame, FrameSpec, PixelFormat, RawFileSource};
pub use ports::{ArgumentBuilder, FrameSource, IterSource, ProgressSink, StaticArgs};
