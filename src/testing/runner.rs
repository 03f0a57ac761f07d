//! Test runner implementation
//!
//! Connects to a server and runs a scenario's steps one at a time, printing
//! progress as it goes.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::common::config::Config;
use crate::common::Result;
use crate::pgwire::Frontend;
use crate::script::Endpoint;

use super::config::{load_scenario, TestScenario};

/// Result of a test run
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Overrides and output settings for a run
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Server address, takes precedence over the scenario and config file
    pub connect: Option<String>,
    /// Per-operation deadline in seconds, takes precedence over the scenario
    pub timeout_secs: Option<u64>,
    /// Print each step's full message
    pub verbose: bool,
    /// Print nothing; the caller reports the result
    pub quiet: bool,
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, options: &RunOptions) -> Result<TestResult> {
    let scenario = load_scenario(path)?;
    let config = Config::load()?;
    run_with_config(&scenario, &config, options).await
}

/// Connect using `config` defaults and run `scenario`
///
/// Connection failures are errors; a failing step is a failed `TestResult`.
pub async fn run_with_config(
    scenario: &TestScenario,
    config: &Config,
    options: &RunOptions,
) -> Result<TestResult> {
    let address = options
        .connect
        .as_deref()
        .or(scenario.connect.as_deref())
        .unwrap_or(&config.connection.address);
    let io_timeout = options
        .timeout_secs
        .or(scenario.timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.timeouts.io());

    if !options.quiet {
        println!(
            "\n{} {}",
            "Running Test:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("  {} {}", "Server:".cyan(), address.dimmed());
    }

    tracing::info!(scenario = %scenario.name, address, "running scenario");
    let mut frontend = Frontend::connect(address, config.timeouts.connect())
        .await?
        .with_timeout(io_timeout);

    Ok(run_steps(scenario, &mut frontend, options).await)
}

/// Run a scenario's top-level steps against an already connected endpoint
pub async fn run_steps<E>(
    scenario: &TestScenario,
    endpoint: &mut E,
    options: &RunOptions,
) -> TestResult
where
    E: Endpoint + ?Sized,
{
    let steps_total = scenario.steps.len();
    let script = scenario.script();

    if !options.quiet {
        println!("\n{}", "Steps:".cyan());
    }

    let mut steps_run = 0;
    let outcome = script
        .run_observed(endpoint, |index, step, outcome| {
            steps_run = index + 1;
            if options.quiet {
                return;
            }
            match outcome {
                Ok(()) => {
                    println!(
                        "  {} Step {}: {}",
                        "✓".green(),
                        steps_run,
                        scenario.steps[index].describe().dimmed()
                    );
                    if options.verbose {
                        println!("      {}", format!("{:?}", step).dimmed());
                    }
                }
                Err(e) => println!("  {} Step {}: {}", "✗".red(), steps_run, e),
            }
        })
        .await;

    let error = match outcome {
        Ok(()) => {
            if !options.quiet {
                println!(
                    "\n{} {}\n",
                    "✓".green().bold(),
                    "Test Passed".green().bold()
                );
            }
            None
        }
        Err(e) => {
            tracing::debug!(step = steps_run, error = %e, "step failed");
            Some(e.to_string())
        }
    };

    TestResult {
        name: scenario.name.clone(),
        passed: error.is_none(),
        steps_run,
        steps_total,
        error,
    }
}
