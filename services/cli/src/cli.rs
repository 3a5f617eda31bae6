use crate::commands::{run_classify, run_records, run_sync};
use apptrack::error::AppError;
use apptrack::tracking::ApplicationStatus;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "apptrack",
    about = "Track job application status from your inbox",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify recent application e-mails and reconcile the tracking table (default command)
    Sync(SyncArgs),
    /// Print the tracking table
    Records(RecordsArgs),
    /// Classify a single answer or e-mail body without touching the table
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct SyncArgs {
    /// Override the configured tracking table path
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Append status transitions to this CSV log
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Override how many days back to search
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) days: Option<u32>,
    /// Write Prometheus metrics for the run to this file
    #[arg(long)]
    pub(crate) metrics: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RecordsArgs {
    /// Override the configured tracking table path
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Only show rows with this status (applied, rejected, advancing, unknown)
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<ApplicationStatus>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct ClassifyArgs {
    /// Raw oracle answer to parse, e.g. "[T, Acme, Engineer]"
    #[arg(long)]
    pub(crate) answer: Option<String>,
    /// File holding a plain-text e-mail body to send to the oracle
    #[arg(long)]
    pub(crate) body_file: Option<PathBuf>,
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, String> {
    ApplicationStatus::ALL
        .into_iter()
        .find(|status| status.label().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| {
            format!("unknown status '{raw}' (expected applied, rejected, advancing or unknown)")
        })
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Sync(SyncArgs::default()));

    match command {
        Command::Sync(args) => run_sync(args),
        Command::Records(args) => run_records(args),
        Command::Classify(args) => run_classify(args),
    }
}
