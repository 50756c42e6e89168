//! Callsight CLI - terminal client for the callsight daemon.

mod cli;
mod client;
mod output;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args).await
}
