use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tweet_sweeper::{
    archive::Archive,
    config::{Credentials, Settings},
    console::Terminal,
    core::{cancel::Cancellation, runtime::run_and_commit},
    ledger::Ledger,
    providers::twitter::Twitter,
};

/// Decide about every tweet in your archive: keep it, or mark it for deletion.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Directory holding tweets.csv (or data/tweets.js) and the decision files
    work_dir: PathBuf,
    /// dotenv-style file with the API keys; deleting is only possible with it
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let archive = Archive::load(&cli.work_dir)?;
    let twitter = match &cli.credentials {
        Some(path) => Some(Twitter::new(&Credentials::from_file(path)?)),
        None => None,
    };
    let mut ledger = Ledger::open(&cli.work_dir, settings.categories.all())?;
    tracing::info!(
        tweets = archive.len(),
        online = twitter.is_some(),
        "starting in {}",
        cli.work_dir.display()
    );

    let cancel = Cancellation::new();
    let signals = cancel.listen_for_interrupts();

    let mut console = Terminal::new(cancel.clone());
    let outcome = run_and_commit(
        &archive,
        &mut ledger,
        &settings,
        &mut console,
        twitter,
        cancel,
    )
    .await;
    signals.abort();
    println!("Cheers!");

    outcome
}
