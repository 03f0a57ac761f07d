//! Script steps
//!
//! Each step performs exactly one interaction with the endpoint: one
//! receive, one send followed by a flush, or one receive-until-match loop.

use std::fmt;

use crate::common::{Error, Result};
use crate::pgwire::{BackendMessage, FrontendMessage, TxStatus};

use super::endpoint::Endpoint;
use super::script::Script;

/// A single unit of work in a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Receive one message and compare it with `want`
    ///
    /// With `any` set, a message of the same variant passes regardless of
    /// its fields.
    Expect { want: BackendMessage, any: bool },
    /// Send a message and flush
    Send(FrontendMessage),
    /// Discard messages until one of the same variant as the witness arrives,
    /// or the stream ends
    WaitFor(BackendMessage),
    /// Nested steps
    Script(Script),
}

impl Step {
    /// Run this step against `endpoint`
    pub async fn step<E>(&self, endpoint: &mut E) -> Result<()>
    where
        E: Endpoint + ?Sized,
    {
        match self {
            Step::Expect { want, any } => expect(endpoint, want, *any).await,
            Step::Send(message) => {
                tracing::debug!(message = message.name(), "sending");
                endpoint.send(message);
                endpoint.flush().await
            }
            Step::WaitFor(terminator) => wait_for_terminator(endpoint, terminator).await,
            Step::Script(script) => script.run(endpoint).await,
        }
    }
}

async fn expect<E>(endpoint: &mut E, want: &BackendMessage, any: bool) -> Result<()>
where
    E: Endpoint + ?Sized,
{
    tracing::debug!(message = want.name(), any, "expecting");
    let got = endpoint.receive().await?;

    if any && got.same_kind(want) {
        return Ok(());
    }

    // A variant mismatch under `any` lands here too, so the error names
    // both messages.
    if got != *want {
        return Err(Error::mismatch(got, want.clone()));
    }

    Ok(())
}

async fn wait_for_terminator<E>(endpoint: &mut E, terminator: &BackendMessage) -> Result<()>
where
    E: Endpoint + ?Sized,
{
    tracing::debug!(terminator = terminator.name(), "waiting");
    loop {
        let message = match endpoint.receive().await {
            Ok(message) => message,
            Err(Error::ConnectionClosed) => {
                tracing::debug!("stream ended before {}", terminator.name());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if message.same_kind(terminator) {
            return Ok(());
        }
        tracing::trace!(message = message.name(), "discarded");
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Expect { want, any: false } => write!(f, "expect {}", want.name()),
            Step::Expect { want, any: true } => write!(f, "expect any {}", want.name()),
            Step::Send(message) => write!(f, "send {}", message.name()),
            Step::WaitFor(terminator) => write!(f, "wait for {}", terminator.name()),
            Step::Script(script) => write!(f, "script ({} steps)", script.len()),
        }
    }
}

impl From<Script> for Step {
    fn from(script: Script) -> Self {
        Step::Script(script)
    }
}

/// Expect the next message to equal `want` exactly
pub fn expect_message(want: BackendMessage) -> Step {
    Step::Expect { want, any: false }
}

/// Expect the next message to be the same variant as `want`
///
/// The fields of `want` are only used in the mismatch error.
pub fn expect_any_message(want: BackendMessage) -> Step {
    Step::Expect { want, any: true }
}

/// Send `message` and flush it to the transport
pub fn send_message(message: FrontendMessage) -> Step {
    Step::Send(message)
}

/// Drain inbound messages until CloseComplete or end of stream
///
/// There is no timeout: a peer that keeps the connection open without ever
/// sending CloseComplete blocks forever unless the endpoint has a deadline.
pub fn wait_for_close() -> Step {
    wait_for(BackendMessage::CloseComplete)
}

/// Drain inbound messages until one of the same variant as `terminator`
/// arrives, or the stream ends
pub fn wait_for(terminator: BackendMessage) -> Step {
    Step::WaitFor(terminator)
}

/// Steps a server sends once it accepts an authenticated connection:
/// AuthenticationOk followed by an idle ReadyForQuery
pub fn accept_authenticated_connection() -> Vec<Step> {
    vec![
        expect_message(BackendMessage::AuthenticationOk),
        expect_message(BackendMessage::ReadyForQuery {
            tx_status: TxStatus::Idle,
        }),
    ]
}
