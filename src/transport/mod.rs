//! The transport seam between the dispatch core and the SMTP protocol.
//!
//! The core treats dial, send, and close as opaque capabilities behind these
//! traits. The production implementation lives in [`smtp`]; tests substitute
//! mocks that count connections and record messages.

pub mod smtp;

pub use smtp::SmtpTransport;

use crate::config::SmtpConfig;
use crate::message::OutboundMessage;
use anyhow::Result;
use async_trait::async_trait;

/// One open connection to a mail server.
///
/// Owned exclusively by the connection worker between a successful dial and
/// the next close; no other component ever holds a reference to it.
#[async_trait]
pub trait MailConnection: Send {
    /// Transmits one message over the open connection.
    async fn send(&mut self, message: &OutboundMessage) -> Result<()>;

    /// Closes the connection. Called once, after which the handle is dropped.
    async fn close(&mut self) -> Result<()>;
}

/// Capability to dial a mail server from a configuration snapshot.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes a connection using the snapshot's host, port, credentials,
    /// and TLS policy. An empty username means an unauthenticated dial.
    async fn dial(&self, config: &SmtpConfig) -> Result<Box<dyn MailConnection>>;
}
