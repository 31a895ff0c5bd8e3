use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tc_cli::commands::{check, config};
use tc_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so they never mix with report output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let settings =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?settings, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Check(args)) => {
            let summary = check::run(&mut stdout, args, &settings)?;
            tracing::debug!(?summary, "check complete");
        }
        Some(Commands::Config) => {
            config::run(&mut stdout, &settings)?;
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
