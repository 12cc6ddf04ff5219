//! Completion coordinator
//!
//! Drives one invocation end to end: launches the process, runs the pipe
//! writer, pipe reader, and diagnostics drain as independent tasks, joins
//! them together with process exit, and reconciles every captured outcome
//! into a single terminal result. Error precedence:
//! `Cancelled` > pipe flow error > non-zero exit > success.

use serde::{Deserialize, Serialize};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::drain::drain_stderr;
use crate::engine::launcher::spawn_process;
use crate::engine::reader::{frame_channel, read_frames, FrameStream, ReaderOutcome};
use crate::engine::writer::{write_frames, WriterOutcome};
use crate::engine::{DiagnosticLog, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::frame::{Frame, FrameSpec};
use crate::ports::{ArgumentBuilder, FrameSource, ProgressSink};

/// Lifecycle of one invocation
///
/// Terminal states are final; an `Invocation` is never reused across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationState {
    /// Created, not yet started
    Idle,
    /// Spawning the external process
    Launching,
    /// Pipes flowing
    Running,
    /// Process exited zero and all flows completed
    Succeeded,
    /// A flow error or non-zero exit was reported
    Failed,
    /// The caller aborted the run
    Cancelled,
}

impl InvocationState {
    /// Whether this state is final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::Succeeded | InvocationState::Failed | InvocationState::Cancelled
        )
    }
}

/// Terminal value of a successful invocation
///
/// Immutable once produced; the diagnostic log is exposed verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Process exit code (zero here; non-zero exits surface as errors)
    pub exit_code: i32,
    /// Full ordered diagnostic log
    pub log: DiagnosticLog,
    /// Frames written to the process, encode direction
    pub frames_written: u64,
    /// Frames reconstructed from the process, decode direction
    pub frames_read: u64,
}

/// One end-to-end run of the external executable
pub struct Invocation {
    config: EngineConfig,
    cancel: CancellationToken,
    state_tx: watch::Sender<InvocationState>,
    state_rx: watch::Receiver<InvocationState>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Invocation {
    /// Create an idle invocation
    pub fn new(config: EngineConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(InvocationState::Idle);
        Self {
            config,
            cancel: CancellationToken::new(),
            state_tx,
            state_rx,
            progress: None,
        }
    }

    /// Install an optional progress observer fed by the diagnostics drain
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Shared cancellation token
    ///
    /// Safe to trigger from any task at any time; triggering twice has the
    /// same effect as once.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<InvocationState> {
        self.state_rx.clone()
    }

    /// Encode: stream frames from `source` into the process
    pub async fn encode(
        self,
        args: &dyn ArgumentBuilder,
        source: Box<dyn FrameSource>,
    ) -> EngineResult<InvocationResult> {
        self.run_flows(args.build(), Some(source), None).await
    }

    /// Decode: reconstruct frames from the process's standard output
    ///
    /// Returns a session whose frame stream is consumed lazily while the
    /// invocation runs; `finish` produces the terminal result.
    pub fn decode(self, args: &dyn ArgumentBuilder, spec: FrameSpec) -> DecodeSession {
        let tokens = args.build();
        let (tx, stream) = frame_channel(self.config.frame_channel_capacity);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(self.run_flows(tokens, None, Some((spec, tx))));
        DecodeSession {
            frames: stream,
            cancel,
            handle,
        }
    }

    /// Transcode: frames in, frames out, both directions piped
    pub fn transcode(
        self,
        args: &dyn ArgumentBuilder,
        source: Box<dyn FrameSource>,
        spec: FrameSpec,
    ) -> DecodeSession {
        let tokens = args.build();
        let (tx, stream) = frame_channel(self.config.frame_channel_capacity);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(self.run_flows(tokens, Some(source), Some((spec, tx))));
        DecodeSession {
            frames: stream,
            cancel,
            handle,
        }
    }

    /// Run with no frame pipes, draining diagnostics only
    pub async fn run(self, args: &dyn ArgumentBuilder) -> EngineResult<InvocationResult> {
        self.run_flows(args.build(), None, None).await
    }

    fn set_state(&self, state: InvocationState) {
        // Receivers may be gone; state is advisory.
        let _ = self.state_tx.send(state);
    }

    async fn run_flows(
        self,
        args: Vec<String>,
        source: Option<Box<dyn FrameSource>>,
        output: Option<(FrameSpec, mpsc::Sender<Frame>)>,
    ) -> EngineResult<InvocationResult> {
        self.set_state(InvocationState::Launching);
        info!(executable = %self.config.executable, "starting invocation");

        let mut pipes = match spawn_process(&self.config.executable, &args) {
            Ok(pipes) => pipes,
            Err(e) => {
                self.set_state(InvocationState::Failed);
                return Err(e);
            }
        };
        self.set_state(InvocationState::Running);

        // Pipe writer: present in the encode direction. Without a source
        // stdin is dropped immediately so the tool sees end-of-input.
        let stdin = pipes.stdin.take();
        let writer: Option<JoinHandle<WriterOutcome>> = match (stdin, source) {
            (Some(stdin), Some(source)) => Some(tokio::spawn(write_frames(
                stdin,
                source,
                self.cancel.clone(),
            ))),
            (stdin, _) => {
                drop(stdin);
                None
            }
        };

        // Pipe reader: present in the decode direction. Otherwise stdout is
        // still drained to a sink so the child can never stall on it.
        let stdout = pipes.stdout.take();
        let reader: Option<JoinHandle<ReaderOutcome>> = match (stdout, output) {
            (Some(stdout), Some((spec, tx))) => Some(tokio::spawn(read_frames(
                stdout,
                spec,
                tx,
                self.cancel.clone(),
            ))),
            (Some(mut stdout), None) => {
                tokio::spawn(async move {
                    let _ = tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await;
                });
                None
            }
            (None, _) => None,
        };

        // Diagnostics drain: always present, never gated on the other flows.
        let stderr = match pipes.stderr.take() {
            Some(stderr) => stderr,
            None => {
                self.set_state(InvocationState::Failed);
                return Err(EngineError::Internal("stderr pipe missing".to_string()));
            }
        };
        let drain = tokio::spawn(drain_stderr(stderr, self.progress.clone()));

        let status = self.wait_for_exit(pipes.child).await;

        // After a cancellation-triggered kill, descendants of the child may
        // survive and keep the pipe write ends open, so the flow joins get
        // the same grace budget instead of waiting for the pipes to close.
        let flow_budget = self.cancel.is_cancelled().then(|| self.config.kill_grace());

        let writer_outcome = match writer {
            Some(handle) => join_flow(handle, flow_budget).await?,
            None => None,
        };
        let reader_outcome = match reader {
            Some(handle) => join_flow(handle, flow_budget).await?,
            None => None,
        };
        let log = join_flow(drain, flow_budget).await?.unwrap_or_default();

        self.reconcile(status, writer_outcome, reader_outcome, log)
    }

    /// Wait for process exit, honouring cancellation
    ///
    /// On cancellation the flows close their pipes, which is the tool's cue
    /// to terminate; after the grace period the child is forcibly killed.
    /// Grace expiry is the forcing trigger, not an error.
    async fn wait_for_exit(&self, mut child: Child) -> std::io::Result<ExitStatus> {
        tokio::select! {
            status = child.wait() => return status,
            _ = self.cancel.cancelled() => {}
        }

        debug!(
            grace_ms = self.config.kill_grace_ms,
            "cancelled, waiting for voluntary exit"
        );
        match tokio::time::timeout(self.config.kill_grace(), child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!("grace period expired, killing process");
                child.kill().await?;
                child.wait().await
            }
        }
    }

    fn reconcile(
        &self,
        status: std::io::Result<ExitStatus>,
        writer: Option<WriterOutcome>,
        reader: Option<ReaderOutcome>,
        log: DiagnosticLog,
    ) -> EngineResult<InvocationResult> {
        let frames_written = writer.as_ref().map(|w| w.frames_written).unwrap_or(0);
        let frames_read = reader.as_ref().map(|r| r.frames_read).unwrap_or(0);

        // Cancellation wins over everything, including a simultaneous
        // successful exit.
        if self.cancel.is_cancelled() {
            info!(frames_written, frames_read, "invocation cancelled");
            self.set_state(InvocationState::Cancelled);
            return Err(EngineError::Cancelled);
        }

        // Internal flow errors dominate the exit code.
        if let Some(error) = writer.and_then(|w| w.error) {
            self.set_state(InvocationState::Failed);
            return Err(error);
        }
        if let Some(error) = reader.and_then(|r| r.error) {
            self.set_state(InvocationState::Failed);
            return Err(error);
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                self.set_state(InvocationState::Failed);
                return Err(EngineError::Io(e));
            }
        };

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            warn!(exit_code, lines = log.len(), "process failed");
            self.set_state(InvocationState::Failed);
            return Err(EngineError::ExecutionFailed { exit_code, log });
        }

        info!(frames_written, frames_read, "invocation succeeded");
        self.set_state(InvocationState::Succeeded);
        Ok(InvocationResult {
            exit_code: 0,
            log,
            frames_written,
            frames_read,
        })
    }
}

/// A running decode (or transcode) invocation
///
/// Frames are pulled lazily; the sequence is finite and non-restartable.
pub struct DecodeSession {
    frames: FrameStream,
    cancel: CancellationToken,
    handle: JoinHandle<EngineResult<InvocationResult>>,
}

impl DecodeSession {
    /// Next decoded frame, or `None` once the stream ends
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.next_frame().await
    }

    /// Shared cancellation token for this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Await the terminal result, dropping any unconsumed frames
    pub async fn finish(self) -> EngineResult<InvocationResult> {
        drop(self.frames);
        self.handle
            .await
            .map_err(|e| EngineError::Internal(format!("coordinator task failed: {e}")))?
    }
}

async fn join<T>(handle: JoinHandle<T>) -> EngineResult<T> {
    handle
        .await
        .map_err(|e| EngineError::Internal(format!("flow task failed: {e}")))
}

/// Join a flow task, optionally bounded by the cancellation grace budget
///
/// A flow that outlives the budget is aborted and reported as absent; the
/// invocation is already cancelled at that point and its outcome is fixed.
async fn join_flow<T>(handle: JoinHandle<T>, budget: Option<Duration>) -> EngineResult<Option<T>> {
    let Some(budget) = budget else {
        return join(handle).await.map(Some);
    };
    let abort = handle.abort_handle();
    match tokio::time::timeout(budget, join(handle)).await {
        Ok(joined) => joined.map(Some),
        Err(_) => {
            warn!("flow task outlived the grace budget, aborting");
            abort.abort();
            Ok(None)
        }
    }
}
