//! Rebuilds the credential file from the account columns of the feed.
//!
//! Usage: `visitboard-sync-users [--feed URL] [--output users.json]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use visitboard_lib::error::DashboardError;
use visitboard_lib::{feed, state, sync};

#[derive(Debug, Parser)]
#[command(name = "visitboard-sync-users", version, about)]
struct Cli {
    /// Config file (default: ~/.visitboard/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Feed location; overrides feedUrl from the config
    #[arg(long)]
    feed: Option<String>,

    /// Where to write the credential file (default: credentialsPath)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), DashboardError> {
    let mut config = state::load_config(cli.config.as_deref())?;
    if let Some(feed) = cli.feed {
        config.feed_url = feed;
    }
    let output = match cli.output {
        Some(path) => path,
        None => state::credentials_path(&config)?,
    };

    let source = feed::source_from_location(
        &config.feed_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    log::info!("Fetching accounts from {}", source.describe());
    let credentials = sync::sync_credentials(source.as_ref(), &config)?;

    credentials.save(&output)?;
    log::info!(
        "Wrote {} ({} users)",
        output.display(),
        credentials.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Credential sync failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
