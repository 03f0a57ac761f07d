//! YAML test scenarios
//!
//! A scenario file describes a script declaratively; the runner connects to
//! a server and executes it, reporting which step failed and why.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, run_steps, run_with_config, RunOptions, TestResult};
