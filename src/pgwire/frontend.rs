//! Client side of a PostgreSQL connection
//!
//! Decodes backend messages and buffers frontend messages until flushed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::common::{Error, Result};
use crate::script::Endpoint;

use super::codec::{self, FrameReader};
use super::types::{BackendMessage, FrontendMessage};
use super::with_deadline;

/// Frontend endpoint over an async reader/writer pair
pub struct Frontend<R, W> {
    /// Inbound frames, including any partial frame a deadline cut off
    reader: FrameReader<R>,
    /// Raw writer, written only on flush
    writer: W,
    /// Encoded messages waiting for flush
    pending: Vec<u8>,
    /// Deadline applied to each receive and flush
    timeout: Option<Duration>,
}

impl<R, W> Frontend<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer,
            pending: Vec::new(),
            timeout: None,
        }
    }

    /// Bound every receive and flush by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Receive the next backend message
    pub async fn receive(&mut self) -> Result<BackendMessage> {
        let (tag, body) = with_deadline(self.timeout, self.reader.read_message()).await?;
        let message = BackendMessage::decode(tag, &body)?;
        tracing::trace!(?message, "<- backend");
        Ok(message)
    }

    /// Buffer a frontend message; nothing is written until `flush`
    pub fn send(&mut self, message: &FrontendMessage) {
        tracing::trace!(?message, "-> frontend");
        message.encode(&mut self.pending);
    }

    /// Write all buffered messages to the transport
    ///
    /// Messages the transport did not take stay buffered after a failed or
    /// timed-out flush.
    pub async fn flush(&mut self) -> Result<()> {
        let write = codec::write_pending(&mut self.writer, &mut self.pending);
        with_deadline(self.timeout, write).await
    }
}

impl Frontend<OwnedReadHalf, OwnedWriteHalf> {
    /// Wrap an established TCP connection
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }

    /// Connect to a server at `address`, waiting at most `timeout`
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| Error::Timeout(timeout))?
            .map_err(|source| Error::ConnectionFailed {
                address: address.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        tracing::debug!(address, "connected");
        Ok(Self::from_tcp(stream))
    }
}

#[async_trait]
impl<R, W> Endpoint for Frontend<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> Result<BackendMessage> {
        Frontend::receive(self).await
    }

    fn send(&mut self, message: &FrontendMessage) {
        Frontend::send(self, message)
    }

    async fn flush(&mut self) -> Result<()> {
        Frontend::flush(self).await
    }
}
