//! The resilient content core of Apeiron.
//!
//! - [`StaticCatalog`]: the shipped topics and pre-authored details
//! - [`ResilientInvoker`]: timeout + exponential backoff around provider calls
//! - [`ContentResolver`]: static catalog first, provider fallback second
//! - [`StreamingResponder`]: in-character replies as a closable fragment stream
//! - [`OracleSession`]: one conversation with a topic
//!
//! Nothing here holds a global client: every component takes its provider
//! and catalog explicitly.

pub mod catalog;
pub mod prompt;
pub mod resilience;
pub mod resolver;
pub mod responder;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use catalog::StaticCatalog;
pub use resilience::{ResilientInvoker, RetryPolicy};
pub use resolver::{ContentResolver, ResolveError};
pub use responder::{ReplyStream, SEVERED_MESSAGE, StreamPolicy, StreamingResponder};
pub use session::{OracleSession, ReplyTurn, SessionError};
