//! The outbound message value handed from callers to the connection worker.

/// A single email, built per dispatch call.
///
/// The sender is copied out of the configuration snapshot at construction
/// time, so a reconfiguration between hand-off and transmission never changes
/// an already-queued message. Once placed on the dispatch queue the message
/// is owned exclusively by the worker; it is discarded after the send attempt
/// whether or not delivery succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses, non-empty by construction.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Message body, transmitted as `text/html`.
    pub body: String,
}
