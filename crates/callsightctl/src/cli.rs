//! Command-line interface for callsightctl.

use crate::{client, output};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "callsightctl", version, about = "Customer-service call analysis client")]
pub struct Cli {
    /// Daemon base URL
    #[arg(
        long,
        global = true,
        env = "CALLSIGHTD_URL",
        default_value = "http://127.0.0.1:7430"
    )]
    pub server: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a call transcript or audio file
    Analyze {
        /// Transcript text to analyze
        #[arg(long, conflicts_with = "audio")]
        transcript: Option<String>,

        /// Audio file path to transcribe and analyze
        #[arg(long)]
        audio: Option<String>,

        /// Session id to resume or overwrite
        #[arg(long)]
        session: Option<String>,

        /// Print the raw JSON envelope instead of the formatted report
        #[arg(long)]
        json: bool,
    },

    /// Show the persisted report for a session
    Report {
        session_id: String,
    },

    /// Aggregate statistics across analyzed calls
    Stats,

    /// Daemon health
    Health,
}

pub async fn run(cli: Cli) -> Result<()> {
    let client = client::DaemonClient::new(&cli.server)?;

    match cli.command {
        Command::Analyze {
            transcript,
            audio,
            session,
            json,
        } => {
            let spinner = output::spinner("Analyzing call...");
            let result = client.analyze(transcript, audio, session).await;
            spinner.finish_and_clear();

            let envelope = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                output::print_envelope(&envelope);
            }
        }
        Command::Report { session_id } => {
            output::print_report(&client.report(&session_id).await?);
        }
        Command::Stats => {
            output::print_stats(&client.stats().await?);
        }
        Command::Health => {
            output::print_health(&client.health().await?);
        }
    }
    Ok(())
}
