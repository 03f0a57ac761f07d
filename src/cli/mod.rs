//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use colored::Colorize;

use crate::commands::Commands;
use crate::common::{Error, Result};
use crate::testing::{self, RunOptions, ScenarioStep};

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; a failed scenario is not an
/// `Error`, only problems running it are.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            path,
            connect,
            timeout,
            json,
            verbose,
        } => {
            let options = RunOptions {
                connect,
                timeout_secs: timeout,
                verbose,
                quiet: json,
            };
            let result = testing::run_scenario(&path, &options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if !result.passed {
                println!(
                    "\n{} {}",
                    "✗".red().bold(),
                    "Test Failed".red().bold()
                );
                if let Some(error) = &result.error {
                    println!(
                        "  after {}/{} steps: {}",
                        result.steps_run, result.steps_total, error
                    );
                }
            }

            Ok(result.passed)
        }

        Commands::Check { path } => {
            let scenario = testing::load_scenario(&path)?;
            if scenario.steps.is_empty() {
                return Err(Error::Config(format!(
                    "Scenario '{}' has no steps",
                    path.display()
                )));
            }

            println!("{}", scenario.name.white().bold());
            if let Some(desc) = &scenario.description {
                println!("  {}", desc.dimmed());
            }
            print_outline(&scenario.steps, 1);
            Ok(true)
        }
    }
}

fn print_outline(steps: &[ScenarioStep], depth: usize) {
    for (i, step) in steps.iter().enumerate() {
        println!("{}{}. {}", "  ".repeat(depth), i + 1, step.describe());
        if let ScenarioStep::Group { steps, .. } = step {
            print_outline(steps, depth + 1);
        }
    }
}
