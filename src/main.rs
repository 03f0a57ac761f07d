//! pgmock - scripted PostgreSQL frontend for protocol tests
//!
//! Runs YAML scenarios that send frontend messages and assert on the
//! backend messages a server answers with.

use clap::Parser;
use pgmock::common::logging;
use pgmock::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "pgmock", about = "Scripted PostgreSQL frontend for protocol tests")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
