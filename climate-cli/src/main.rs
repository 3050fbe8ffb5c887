//! Binary crate for the `daily-climate` terminal dashboard.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration and location prompts
//! - Human-friendly output formatting

use clap::Parser;

mod cli;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    climate_core::init_tracing("warn");

    let cmd = cli::Cli::parse();
    cmd.run().await
}
