//! pgmock - scripted mock endpoint for the PostgreSQL wire protocol
//!
//! This library lets a test declare the exact sequence of messages it
//! expects to exchange with a server and then plays it over a live
//! connection, failing on the first mismatch.

pub mod cli;
pub mod commands;
pub mod common;
pub mod pgwire;
pub mod script;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use script::{Endpoint, Script, Step};
