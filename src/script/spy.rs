//! Recording endpoint for unit tests

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::pgwire::{BackendMessage, FrontendMessage};

use super::endpoint::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Receive,
    Send,
    Flush,
}

/// Replays canned receive results and records every call
///
/// Once the canned results run out, `receive` reports end-of-stream.
pub(crate) struct SpyEndpoint {
    inbound: VecDeque<Result<BackendMessage>>,
    flush_error: Option<Error>,
    pub calls: Vec<Call>,
    pub sent: Vec<FrontendMessage>,
}

impl SpyEndpoint {
    pub fn new(inbound: impl IntoIterator<Item = Result<BackendMessage>>) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            flush_error: None,
            calls: Vec::new(),
            sent: Vec::new(),
        }
    }

    /// Make the next flush fail with `error`
    pub fn fail_flush(mut self, error: Error) -> Self {
        self.flush_error = Some(error);
        self
    }

    /// Canned receive results not yet consumed
    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }
}

#[async_trait]
impl Endpoint for SpyEndpoint {
    async fn receive(&mut self) -> Result<BackendMessage> {
        self.calls.push(Call::Receive);
        self.inbound
            .pop_front()
            .unwrap_or(Err(Error::ConnectionClosed))
    }

    fn send(&mut self, message: &FrontendMessage) {
        self.calls.push(Call::Send);
        self.sent.push(message.clone());
    }

    async fn flush(&mut self) -> Result<()> {
        self.calls.push(Call::Flush);
        match self.flush_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
