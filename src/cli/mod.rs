//! Command-line interface module

pub mod args;
pub mod commands;

use clap::{Parser, Subcommand};

pub use args::{DecodeArgs, EncodeArgs, RunArgs};

/// Framepipe: drive an external media transcoder over raw frame pipes
#[derive(Parser, Debug)]
#[command(name = "framepipe", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode a raw frame file into a media file
    Encode(EncodeArgs),
    /// Decode a media file into a raw frame file
    Decode(DecodeArgs),
    /// Run the tool with a literal argument list, capturing diagnostics
    Run(RunArgs),
}
