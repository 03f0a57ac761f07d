//! Error types for pgmock
//!
//! Errors returned from a script run are meant to be shown directly as a
//! test failure, so their messages carry everything needed to diagnose it.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::pgwire::BackendMessage;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pgmock
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    // === Protocol Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    // === Script Errors ===
    #[error("Message mismatch: received {actual:?}, expected {expected:?}")]
    MessageMismatch {
        actual: Box<BackendMessage>,
        expected: Box<BackendMessage>,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario '{path}': {error}")]
    ScenarioParse { path: String, error: String },

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a message mismatch error from the received and expected messages
    pub fn mismatch(actual: BackendMessage, expected: BackendMessage) -> Self {
        Self::MessageMismatch {
            actual: Box::new(actual),
            expected: Box::new(expected),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether this error means the peer closed the stream at a message boundary
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::ConnectionClosed)
    }
}
