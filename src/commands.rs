//! CLI command definitions
//!
//! Defines the clap commands for the pgmock CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a YAML scenario against a PostgreSQL server
    Run {
        /// Path to the YAML scenario file
        path: PathBuf,

        /// Server address (host:port), overrides the scenario and config file
        #[arg(long, short)]
        connect: Option<String>,

        /// Deadline in seconds for each receive and flush
        #[arg(long, short)]
        timeout: Option<u64>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse a scenario and print its steps without connecting
    Check {
        /// Path to the YAML scenario file
        path: PathBuf,
    },
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Run { verbose: true, .. })
    }
}
