//! The connection capability a script runs against

use async_trait::async_trait;

use crate::common::Result;
use crate::pgwire::{BackendMessage, FrontendMessage};

/// One end of a protocol connection, as seen by a mock frontend
///
/// The caller owns the endpoint and the connection under it; running a
/// script only borrows it and never closes it. Implementations decide how
/// long each call may block: scripts impose no deadline of their own.
#[async_trait]
pub trait Endpoint: Send {
    /// Receive the next decoded inbound message
    ///
    /// Returns `Error::ConnectionClosed` when the peer ended the stream at a
    /// message boundary.
    async fn receive(&mut self) -> Result<BackendMessage>;

    /// Buffer an outbound message for the next flush
    fn send(&mut self, message: &FrontendMessage);

    /// Write every buffered message to the transport
    async fn flush(&mut self) -> Result<()>;
}
