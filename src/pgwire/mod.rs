//! PostgreSQL frontend/backend protocol plumbing
//!
//! A minimal codec for the message subset that mock scripts exchange, plus
//! the two connection ends: [`Frontend`] (what a script drives) and
//! [`Backend`] (what a test peer plays).

pub mod backend;
pub mod codec;
pub mod frontend;
pub mod types;

use std::future::Future;
use std::time::Duration;

use crate::common::{Error, Result};

pub use backend::Backend;
pub use frontend::Frontend;
pub use types::*;

/// Run `fut`, failing with `Error::Timeout` once `timeout` elapses
pub(crate) async fn with_deadline<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => fut.await,
    }
}
