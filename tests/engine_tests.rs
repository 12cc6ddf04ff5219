//! Integration tests for the pipe-streaming engine
//!
//! Each test drives a real child process built from a small shell stub so
//! the pipe, exit, and cancellation behaviour is exercised end to end.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use framepipe::engine::progress::ProgressUpdate;
use framepipe::{
    EngineConfig, EngineError, Frame, FrameSpec, Invocation, IterSource, PixelFormat,
    ProgressSink, StaticArgs,
};

// Test utilities

/// Engine config pointing at `sh` with a short kill grace
fn sh_config() -> EngineConfig {
    EngineConfig {
        executable: "sh".to_string(),
        kill_grace_ms: 200,
        frame_channel_capacity: 4,
    }
}

/// Argument list running `script` under `sh -c`
fn stub(script: &str) -> StaticArgs {
    StaticArgs::new(["-c", script])
}

/// A source of `n` identical frames
fn frames(n: usize, spec: FrameSpec) -> Box<IterSource<std::vec::IntoIter<Frame>>> {
    let frame = Frame::new(spec, vec![0xAB; spec.frame_len()]).unwrap();
    let frames: Vec<Frame> = std::iter::repeat(frame).take(n).collect();
    Box::new(IterSource::new(frames.into_iter()))
}

fn small_spec() -> FrameSpec {
    FrameSpec::new(8, 8, PixelFormat::Gray8).unwrap()
}

/// A frame larger than any OS pipe buffer, so writes only complete when the
/// child actually consumes them
fn huge_spec() -> FrameSpec {
    FrameSpec::new(1024, 512, PixelFormat::Rgba).unwrap()
}

// Encode direction

#[tokio::test]
async fn encode_writes_all_frames_and_closes_stdin() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("count.txt");
    // wc only terminates once stdin closes, so a completed invocation
    // proves end-of-input was signalled.
    let script = format!("wc -c > {}", out.display());

    let spec = small_spec();
    let result = Invocation::new(sh_config())
        .encode(&stub(&script), frames(10, spec))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.frames_written, 10);

    let counted: usize = std::fs::read_to_string(&out)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(counted, 10 * spec.frame_len());
}

#[tokio::test]
async fn encode_zero_frames_still_succeeds() {
    let result = Invocation::new(sh_config())
        .encode(&stub("cat > /dev/null"), frames(0, small_spec()))
        .await
        .unwrap();
    assert_eq!(result.frames_written, 0);
}

#[tokio::test]
async fn broken_pipe_reports_exact_partial_count() {
    let spec = huge_spec();
    // The stub consumes exactly one frame and exits; frame two can never
    // fit in the pipe buffer, so the writer fails on it deterministically.
    let script = format!("head -c {} > /dev/null", spec.frame_len());

    let err = Invocation::new(sh_config())
        .encode(&stub(&script), frames(4, spec))
        .await
        .unwrap_err();

    match err {
        EngineError::WriteFailure { frames_written, .. } => assert_eq!(frames_written, 1),
        other => panic!("unexpected error: {other}"),
    }
}

// Decode direction

#[tokio::test]
async fn decode_yields_exactly_k_frames() {
    let spec = small_spec();
    let script = format!("head -c {} /dev/zero", 3 * spec.frame_len());

    let mut session = Invocation::new(sh_config()).decode(&stub(&script), spec);
    let mut count = 0;
    while let Some(frame) = session.next_frame().await {
        assert_eq!(frame.spec(), spec);
        assert!(frame.data().iter().all(|&b| b == 0));
        count += 1;
    }
    assert_eq!(count, 3);

    let result = session.finish().await.unwrap();
    assert_eq!(result.frames_read, 3);
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn decode_partial_tail_is_truncated_stream() {
    let spec = small_spec();
    let script = format!("head -c {} /dev/zero", 2 * spec.frame_len() + 5);

    let mut session = Invocation::new(sh_config()).decode(&stub(&script), spec);
    let mut count = 0;
    while session.next_frame().await.is_some() {
        count += 1;
    }
    assert_eq!(count, 2);

    let err = session.finish().await.unwrap_err();
    match err {
        EngineError::TruncatedStream {
            frames_read,
            trailing_bytes,
        } => {
            assert_eq!(frames_read, 2);
            assert_eq!(trailing_bytes, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// Transcode direction

#[tokio::test]
async fn transcode_round_trips_frames_through_the_child() {
    let spec = small_spec();
    let mut session = Invocation::new(sh_config()).transcode(&stub("cat"), frames(6, spec), spec);

    let mut count = 0;
    while let Some(frame) = session.next_frame().await {
        assert_eq!(frame.spec(), spec);
        assert!(frame.data().iter().all(|&b| b == 0xAB));
        count += 1;
    }
    assert_eq!(count, 6);

    let result = session.finish().await.unwrap();
    assert_eq!(result.frames_written, 6);
    assert_eq!(result.frames_read, 6);
    assert_eq!(result.exit_code, 0);
}

// Diagnostics

#[tokio::test]
async fn stderr_lines_keep_production_order_while_stdin_flows() {
    let spec = small_spec();
    // The stub alternates reads of one frame with writes to stderr.
    let script = format!(
        "for i in 1 2 3 4 5; do head -c {} > /dev/null; echo consumed$i >&2; done",
        spec.frame_len()
    );

    let result = Invocation::new(sh_config())
        .encode(&stub(&script), frames(5, spec))
        .await
        .unwrap();

    let texts: Vec<&str> = result.log.lines().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["consumed1", "consumed2", "consumed3", "consumed4", "consumed5"]
    );
    for (i, line) in result.log.lines().iter().enumerate() {
        assert_eq!(line.seq, i as u64);
    }
}

#[tokio::test]
async fn nonzero_exit_with_silent_stderr_yields_empty_log() {
    let err = Invocation::new(sh_config())
        .run(&stub("exit 3"))
        .await
        .unwrap_err();

    match err {
        EngineError::ExecutionFailed { exit_code, log } => {
            assert_eq!(exit_code, 3);
            assert!(log.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn failure_log_carries_stderr_detail() {
    let err = Invocation::new(sh_config())
        .run(&stub("echo 'no such codec' >&2; exit 1"))
        .await
        .unwrap_err();

    match err {
        EngineError::ExecutionFailed { exit_code, log } => {
            assert_eq!(exit_code, 1);
            assert_eq!(log.lines()[0].text, "no such codec");
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct CollectProgress(std::sync::Mutex<Vec<ProgressUpdate>>);

impl ProgressSink for CollectProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        self.0.lock().unwrap().push(update);
    }
}

#[tokio::test]
async fn progress_sink_sees_parsed_status_lines() {
    let sink = Arc::new(CollectProgress(std::sync::Mutex::new(Vec::new())));
    let script = "echo 'frame=    5 fps= 10 time=00:00:00.20 speed=0.9x' >&2";

    Invocation::new(sh_config())
        .with_progress(sink.clone())
        .run(&stub(script))
        .await
        .unwrap();

    let updates = sink.0.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].frames, Some(5));
    assert_eq!(updates[0].speed, Some(0.9));
}

// Cancellation

#[tokio::test]
async fn cancel_mid_stream_yields_cancelled() {
    let spec = small_spec();
    let frame = Frame::new(spec, vec![0u8; spec.frame_len()]).unwrap();
    let endless = Box::new(IterSource::new(std::iter::repeat(frame)));

    let invocation = Invocation::new(sh_config());
    let token = invocation.cancellation_token();

    let run =
        tokio::spawn(async move { invocation.encode(&stub("cat > /dev/null"), endless).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn cancel_wins_over_simultaneous_clean_exit() {
    let invocation = Invocation::new(sh_config());
    invocation.cancellation_token().cancel();

    // The stub exits zero immediately, but the cancelled token dominates.
    let err = invocation.run(&stub("exit 0")).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn cancel_kills_a_lingering_process_after_grace() {
    let invocation = Invocation::new(sh_config());
    let token = invocation.cancellation_token();

    let start = Instant::now();
    let run = tokio::spawn(async move { invocation.run(&stub("sleep 60")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    // Grace is 200ms; anything close to the stub's sleep means no kill.
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn cancel_stays_bounded_when_a_descendant_inherits_the_pipes() {
    let invocation = Invocation::new(sh_config());
    let token = invocation.cancellation_token();

    let start = Instant::now();
    // The stub forks a long-lived child that inherits stdout/stderr, so the
    // pipe write ends stay open after the shell itself is killed.
    let run = tokio::spawn(async move { invocation.run(&stub("sleep 60 & wait")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn cancelling_twice_behaves_like_once() {
    let invocation = Invocation::new(sh_config());
    let token = invocation.cancellation_token();
    token.cancel();
    token.cancel();

    let err = invocation.run(&stub("exit 0")).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

// Launch failures

#[tokio::test]
async fn missing_executable_is_launch_error() {
    let config = EngineConfig {
        executable: "/no/such/transcoder".to_string(),
        ..EngineConfig::default()
    };
    let err = Invocation::new(config)
        .run(&StaticArgs::new(["-version"]))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Launch { .. }));
}
