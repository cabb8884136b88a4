use crate::config::AppConfig;
use crate::dialer::{DialerError, DialerTaskManager};
use crate::error::AppError;
use crate::infra::{default_buckets, InMemoryDeferredQueue, InMemoryDialerRepository, StubVendorClient};
use crate::server;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "loanflow",
    about = "Loan origination workflow engine and collections dialer backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Operate the outbound dialer pipeline from the command line
    Dialer {
        #[command(subcommand)]
        command: DialerCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DialerCommand {
    /// Run one bucket through select, construct, and upload
    Run(DialerRunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct DialerRunArgs {
    /// Bucket name, e.g. B1
    #[arg(long)]
    bucket: String,
    /// Calendar day to run as, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Dialer {
            command: DialerCommand::Run(args),
        } => run_dialer_bucket(args),
    }
}

fn run_dialer_bucket(args: DialerRunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let bucket = default_buckets()
        .into_iter()
        .find(|bucket| bucket.name == args.bucket)
        .ok_or_else(|| {
            AppError::Dialer(DialerError::Store(crate::dialer::StoreError::NotFound))
        })?;

    let repository = Arc::new(InMemoryDialerRepository::default());
    let vendor = Arc::new(StubVendorClient::default());
    let deferred = Arc::new(InMemoryDeferredQueue::default());
    let manager = DialerTaskManager::new(repository, vendor, deferred, config.dialer);

    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let summary = manager.run_bucket(&bucket, as_of)?;
    println!(
        "task {} bucket {}: {} candidates, {} contacts in {} batches, {} excluded",
        summary.task_id,
        summary.bucket,
        summary.candidates,
        summary.uploaded_contacts,
        summary.batches,
        summary.exclusions.len()
    );
    Ok(())
}
