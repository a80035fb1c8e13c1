use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use visitboard_lib::auth::CredentialStore;
use visitboard_lib::console::Console;
use visitboard_lib::error::DashboardError;
use visitboard_lib::feed;
use visitboard_lib::render::RenderOptions;
use visitboard_lib::state::{self, AppState};

/// Store-visit reporting dashboard.
#[derive(Debug, Parser)]
#[command(name = "visitboard", version, about)]
struct Cli {
    /// Config file (default: ~/.visitboard/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Feed location; overrides feedUrl from the config
    #[arg(long)]
    feed: Option<String>,

    /// Credential file; overrides credentialsPath from the config
    #[arg(long)]
    credentials: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), DashboardError> {
    let mut config = state::load_config(cli.config.as_deref())?;
    if let Some(feed) = cli.feed {
        config.feed_url = feed;
    }

    let source = feed::source_from_location(
        &config.feed_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let credentials_path = match cli.credentials {
        Some(path) => path,
        None => state::credentials_path(&config)?,
    };
    let credentials = CredentialStore::load(&credentials_path)?;
    log::info!(
        "Serving {} with {} account(s)",
        source.describe(),
        credentials.len()
    );

    let state = AppState::new(config, source, credentials);
    let opts = RenderOptions {
        hyperlinks: io::stdout().is_terminal(),
    };
    let stdin = io::stdin();
    let mut console = Console::new(&state, stdin.lock(), io::stdout(), opts);
    console.run()?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            eprintln!("{}", e.recovery_suggestion());
            ExitCode::FAILURE
        }
    }
}
