//! Server side of a PostgreSQL connection
//!
//! The mirror image of [`Frontend`](super::Frontend): decodes frontend
//! messages and buffers backend messages. Tests use it to play the server
//! peer a script talks to.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::common::Result;

use super::codec::{self, FrameReader};
use super::types::{BackendMessage, FrontendMessage};
use super::with_deadline;

/// Backend endpoint over an async reader/writer pair
pub struct Backend<R, W> {
    reader: FrameReader<R>,
    writer: W,
    pending: Vec<u8>,
    timeout: Option<Duration>,
}

impl<R, W> Backend<R, W>
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

    /// Receive a startup-phase message (startup, cancel or SSL request)
    pub async fn receive_startup(&mut self) -> Result<FrontendMessage> {
        let body = with_deadline(self.timeout, self.reader.read_startup_message()).await?;
        let message = FrontendMessage::decode_startup(&body)?;
        tracing::trace!(?message, "<- frontend");
        Ok(message)
    }

    /// Receive the next typed frontend message
    pub async fn receive(&mut self) -> Result<FrontendMessage> {
        let (tag, body) = with_deadline(self.timeout, self.reader.read_message()).await?;
        let message = FrontendMessage::decode(tag, &body)?;
        tracing::trace!(?message, "<- frontend");
        Ok(message)
    }

    /// Buffer a backend message; nothing is written until `flush`
    pub fn send(&mut self, message: &BackendMessage) {
        tracing::trace!(?message, "-> backend");
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

    /// Close the write half so the peer sees end-of-stream
    pub async fn shutdown(&mut self) -> Result<()> {
        self.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl Backend<OwnedReadHalf, OwnedWriteHalf> {
    /// Wrap an accepted TCP connection
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgwire::{Frontend, ObjectType, TxStatus};

    #[tokio::test]
    async fn test_frontend_and_backend_talk() {
        let (client, server) = tokio::io::duplex(1024);
        let (cr, cw) = tokio::io::split(client);
        let (sr, sw) = tokio::io::split(server);
        let mut frontend = Frontend::new(cr, cw);
        let mut backend = Backend::new(sr, sw);

        let startup = FrontendMessage::startup([("user", "postgres")]);
        frontend.send(&startup);
        frontend.send(&FrontendMessage::Close {
            object_type: ObjectType::Portal,
            name: "p1".to_string(),
        });
        frontend.flush().await.unwrap();

        assert_eq!(backend.receive_startup().await.unwrap(), startup);
        assert_eq!(
            backend.receive().await.unwrap(),
            FrontendMessage::Close {
                object_type: ObjectType::Portal,
                name: "p1".to_string(),
            }
        );

        backend.send(&BackendMessage::CloseComplete);
        backend.send(&BackendMessage::ReadyForQuery {
            tx_status: TxStatus::Idle,
        });
        backend.shutdown().await.unwrap();

        assert_eq!(
            frontend.receive().await.unwrap(),
            BackendMessage::CloseComplete
        );
        assert_eq!(
            frontend.receive().await.unwrap(),
            BackendMessage::ReadyForQuery {
                tx_status: TxStatus::Idle
            }
        );
        assert!(frontend.receive().await.unwrap_err().is_end_of_stream());
    }
}
