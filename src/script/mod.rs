//! Scripted mock frontend
//!
//! A [`Script`] is an ordered list of [`Step`]s run against an
//! [`Endpoint`]. Steps run strictly one after another and the first failure
//! ends the run:
//!
//! ```no_run
//! use pgmock::pgwire::{Frontend, FrontendMessage};
//! use pgmock::script::{accept_authenticated_connection, send_message, Script};
//!
//! # async fn example() -> pgmock::Result<()> {
//! let mut script = Script::new(vec![
//!     send_message(FrontendMessage::startup([("user", "postgres")])),
//! ]);
//! script.extend(accept_authenticated_connection());
//!
//! let mut frontend = Frontend::connect("127.0.0.1:5432", std::time::Duration::from_secs(5)).await?;
//! script.run(&mut frontend).await?;
//! # Ok(())
//! # }
//! ```

mod endpoint;
#[allow(clippy::module_inception)]
mod script;
mod step;

#[cfg(test)]
pub(crate) mod spy;

pub use endpoint::Endpoint;
pub use script::Script;
pub use step::{
    accept_authenticated_connection, expect_any_message, expect_message, send_message, wait_for,
    wait_for_close, Step,
};
