//! Diagnostics sink for non-fatal internal errors.
//!
//! The dispatch core never raises transport failures (dial, send, close) to
//! the caller that queued the message; by the time they occur the hand-off
//! has already succeeded. They are reported here instead.

use tracing::error;

/// Receives the dispatch core's non-fatal errors.
pub trait Diagnostic: Send + Sync {
    /// Report an internal error together with a short description of the
    /// operation that failed.
    fn error(&self, msg: &str, err: &anyhow::Error);
}

/// Default sink that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostic;

impl Diagnostic for TracingDiagnostic {
    fn error(&self, msg: &str, err: &anyhow::Error) {
        error!(error = %err, "{}", msg);
    }
}
