//! Command-line argument definitions

use clap::Args;

use crate::frame::PixelFormat;

/// Arguments for the encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw frame input file path
    #[arg(short, long)]
    pub input: String,

    /// Frame width in pixels
    #[arg(long)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long)]
    pub height: u32,

    /// Pixel format tag (rgba, bgra, rgb24, gray, gray16le, rgb48le)
    #[arg(long, default_value = "rgba")]
    pub pix_fmt: PixelFormat,

    /// Input frame rate
    #[arg(long, default_value = "25")]
    pub fps: u32,

    /// Output media file path
    #[arg(short, long)]
    pub output: String,

    /// Video codec passed to the tool
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// Transcoder executable
    #[arg(long, env = "FRAMEPIPE_EXE", default_value = "ffmpeg")]
    pub exe: String,

    /// Emit progress events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the decode command
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: String,

    /// Output frame width in pixels
    #[arg(long)]
    pub width: u32,

    /// Output frame height in pixels
    #[arg(long)]
    pub height: u32,

    /// Pixel format tag for the raw output
    #[arg(long, default_value = "rgba")]
    pub pix_fmt: PixelFormat,

    /// Raw frame output file path
    #[arg(short, long)]
    pub output: String,

    /// Transcoder executable
    #[arg(long, env = "FRAMEPIPE_EXE", default_value = "ffmpeg")]
    pub exe: String,

    /// Emit progress events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Transcoder executable
    #[arg(long, env = "FRAMEPIPE_EXE", default_value = "ffmpeg")]
    pub exe: String,

    /// Print the captured diagnostic log even on success
    #[arg(long)]
    pub show_log: bool,

    /// Literal tokens handed to the tool, unescaped and uninterpreted
    #[arg(trailing_var_arg = true, required = true)]
    pub tokens: Vec<String>,
}
