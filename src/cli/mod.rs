//! Command-line interface for the filmlog server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Filmlog - personal film catalog and watchlist API
#[derive(Debug, Parser)]
#[command(name = "filmlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config.toml (defaults to the usual search locations)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "s")]
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Load and validate configuration, then print it without secrets
    #[command(alias = "check")]
    CheckConfig,
}

impl Cli {
    #[must_use]
    pub fn subcommand(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}
