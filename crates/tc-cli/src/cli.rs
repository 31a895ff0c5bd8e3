//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::check::CheckArgs;

/// Timecard meal-break compliance checker.
///
/// Reconstructs daily shifts from time-clock exports and flags days that
/// worked past the threshold without a timely meal break.
#[derive(Debug, Parser)]
#[command(name = "tc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check a timecard export for meal-break violations.
    Check(CheckArgs),

    /// Print the effective rule configuration.
    Config,
}
