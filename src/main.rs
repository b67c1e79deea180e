// ABOUTME: Entry point for the tagflip CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use std::path::PathBuf;
use tagflip::config::{self, Config};
use tagflip::control::Status;
use tagflip::error::Result;
use tagflip::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);

    match run(cli, &output).await {
        Ok(Status::Failed) => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            output.error(&e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<Status> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { pipeline, force } => {
            config::init_config(&cwd, pipeline.as_deref(), force)?;
            output.progress(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(Status::Ok)
        }
        Commands::Update { repository } => {
            let (config, base) = load_config(cli.config, cwd)?;
            commands::update(&config, &base, &repository, output).await
        }
        Commands::Rollback { repository } => {
            let (config, base) = load_config(cli.config, cwd)?;
            commands::rollback(&config, &base, &repository, output).await
        }
        Commands::Handle { action, event } => {
            let (config, base) = load_config(cli.config, cwd)?;
            commands::handle(&config, &base, action.into(), &event, output).await
        }
        Commands::History { repository, limit } => {
            let (config, base) = load_config(cli.config, cwd)?;
            commands::history(&config, &base, repository.as_deref(), limit, output).await?;
            Ok(Status::Ok)
        }
    }
}

/// Load the configuration and the directory its relative paths hang off.
fn load_config(path: Option<PathBuf>, cwd: PathBuf) -> Result<(Config, PathBuf)> {
    let (config, base) = match path {
        Some(path) => {
            let config = Config::load(&path)?;
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or(cwd);
            (config, base)
        }
        None => (Config::discover(&cwd)?, cwd),
    };
    Ok((config.with_env_overrides()?, base))
}
