//! Framepipe CLI
//!
//! Streams raw video frames to and from an external transcoding executable
//! over its standard pipes.
//!
//! # Usage
//!
//! ```bash
//! framepipe encode --input frames.raw --width 320 --height 240 --output out.mp4
//! framepipe decode --input in.mp4 --width 320 --height 240 --output frames.raw
//! framepipe run -- -version
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use framepipe::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    debug!(?cli, "parsed command line");

    match cli.command {
        Commands::Encode(args) => commands::execute_encode(args).await,
        Commands::Decode(args) => commands::execute_decode(args).await,
        Commands::Run(args) => commands::execute_run(args).await,
    }
}
