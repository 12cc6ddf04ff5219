//! Command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::cli::{DecodeArgs, EncodeArgs, RunArgs};
use crate::engine::progress::ProgressUpdate;
use crate::engine::{EngineConfig, Invocation, InvocationResult};
use crate::frame::{FrameSpec, RawFileSource};
use crate::ports::{ProgressSink, StaticArgs};

/// Progress sink logging updates through tracing
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        if let (Some(frames), Some(speed)) = (update.frames, update.speed) {
            info!(frames, speed, "transcoding");
        } else if let Some(time) = update.time_seconds {
            info!(time, "transcoding");
        }
    }
}

/// Progress sink emitting one JSON event per update
struct JsonProgress;

impl ProgressSink for JsonProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        let event = serde_json::json!({
            "event": "progress",
            "frames": update.frames,
            "fps": update.fps,
            "time_seconds": update.time_seconds,
            "speed": update.speed,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        println!("{event}");
    }
}

fn progress_sink(json: bool) -> Arc<dyn ProgressSink> {
    if json {
        Arc::new(JsonProgress)
    } else {
        Arc::new(ConsoleProgress)
    }
}

fn summarize(result: &InvocationResult) {
    info!(
        frames_written = result.frames_written,
        frames_read = result.frames_read,
        log_lines = result.log.len(),
        "invocation complete"
    );
}

/// Execute the encode command
pub async fn execute_encode(args: EncodeArgs) -> Result<()> {
    let spec = FrameSpec::new(args.width, args.height, args.pix_fmt)?;
    let source = RawFileSource::open(&args.input, spec)
        .await
        .with_context(|| format!("cannot open raw frame file {}", args.input))?;

    let geometry = format!("{}x{}", args.width, args.height);
    let fps = args.fps.to_string();
    let tool_args = StaticArgs::new([
        "-hide_banner",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        args.pix_fmt.tag(),
        "-s",
        geometry.as_str(),
        "-r",
        fps.as_str(),
        "-i",
        "-",
        "-c:v",
        args.codec.as_str(),
        args.output.as_str(),
    ]);

    let config = EngineConfig {
        executable: args.exe,
        ..EngineConfig::default()
    };
    let result = Invocation::new(config)
        .with_progress(progress_sink(args.json))
        .encode(&tool_args, Box::new(source))
        .await?;

    summarize(&result);
    Ok(())
}

/// Execute the decode command
pub async fn execute_decode(args: DecodeArgs) -> Result<()> {
    let spec = FrameSpec::new(args.width, args.height, args.pix_fmt)?;
    let mut out = tokio::fs::File::create(&args.output)
        .await
        .with_context(|| format!("cannot create output file {}", args.output))?;

    let geometry = format!("scale={}:{}", args.width, args.height);
    let tool_args = StaticArgs::new([
        "-hide_banner",
        "-i",
        args.input.as_str(),
        "-vf",
        geometry.as_str(),
        "-f",
        "rawvideo",
        "-pix_fmt",
        args.pix_fmt.tag(),
        "-",
    ]);

    let config = EngineConfig {
        executable: args.exe,
        ..EngineConfig::default()
    };
    let mut session = Invocation::new(config)
        .with_progress(progress_sink(args.json))
        .decode(&tool_args, spec);

    while let Some(frame) = session.next_frame().await {
        out.write_all(frame.data()).await?;
    }
    out.flush().await?;

    let result = session.finish().await?;
    summarize(&result);
    Ok(())
}

/// Execute the run command
pub async fn execute_run(args: RunArgs) -> Result<()> {
    let tool_args = StaticArgs::new(args.tokens);
    let config = EngineConfig {
        executable: args.exe,
        ..EngineConfig::default()
    };

    let result = Invocation::new(config).run(&tool_args).await?;
    if args.show_log {
        print!("{}", result.log);
    }
    summarize(&result);
    Ok(())
}
