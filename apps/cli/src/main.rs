//! courseforge CLI — assemble open-licensed courses from web content.
//!
//! Turns a topic, a duration, and a license allowlist into a course package:
//! syllabus, lessons, quizzes, reading list, and manifest.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
