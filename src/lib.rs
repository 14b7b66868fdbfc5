//! Mailroom - outbound email dispatch over a reused SMTP connection.
//!
//! One background worker task owns the SMTP connection exclusively. Callers
//! hand messages to it through a capacity-one queue; the worker dials lazily
//! on the first message, reuses the connection for subsequent sends, and
//! closes it after a configurable idle period. Configuration can be swapped
//! at runtime; the worker drops its connection and picks up the new snapshot
//! between messages, never mid-send.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod message;
pub mod service;
pub mod transport;
mod worker;

pub use config::{Config, SmtpConfig};
pub use diagnostics::{Diagnostic, TracingDiagnostic};
pub use message::OutboundMessage;
pub use service::{MailerService, SendError, TestOptions, UpdateError};
pub use transport::{MailConnection, SmtpTransport, Transport};
