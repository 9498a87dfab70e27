use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use pomo_core::{MemoryRepository, Repository, Timer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pomo_cli::commands::{cancel, pause, report, start, status, summary};
use pomo_cli::{Backend, Cli, Commands, Config};

/// Load config and open the configured repository, ensuring the database directory exists.
fn open_repository(config_path: Option<&Path>) -> Result<(Arc<dyn Repository>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let repo: Arc<dyn Repository> = match config.backend {
        Backend::Memory => Arc::new(MemoryRepository::new()),
        Backend::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent).context("failed to create database directory")?;
            }
            let db = pomo_db::SqliteRepository::open(&config.database_path)
                .with_context(|| format!("failed to open {}", config.database_path.display()))?;
            Arc::new(db)
        }
    };
    Ok((repo, config))
}

fn open_timer(config_path: Option<&Path>) -> Result<Timer> {
    let (repo, config) = open_repository(config_path)?;
    let timer_config = config
        .timer_config()
        .context("invalid interval durations")?;
    Ok(Timer::new(repo, timer_config))
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received");
            trigger.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config_path = cli.config.as_deref();
    let mut stdout = io::stdout();
    let today = Local::now().date_naive();

    match &cli.command {
        Some(Commands::Start) => {
            let timer = open_timer(config_path)?;
            start::run(&mut stdout, &timer, cancel_on_ctrl_c()).await?;
        }
        Some(Commands::Pause) => {
            let timer = open_timer(config_path)?;
            pause::run(&mut stdout, &timer)?;
        }
        Some(Commands::Cancel) => {
            let timer = open_timer(config_path)?;
            cancel::run(&mut stdout, &timer)?;
        }
        Some(Commands::Status { json }) => {
            let timer = open_timer(config_path)?;
            status::run(&mut stdout, &timer, *json)?;
        }
        Some(Commands::Summary { date }) => {
            let (repo, _config) = open_repository(config_path)?;
            summary::run(&mut stdout, repo.as_ref(), date.unwrap_or(today))?;
        }
        Some(Commands::Report { days, date, json }) => {
            let (repo, _config) = open_repository(config_path)?;
            report::run(
                &mut stdout,
                repo.as_ref(),
                date.unwrap_or(today),
                *days,
                *json,
            )?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
