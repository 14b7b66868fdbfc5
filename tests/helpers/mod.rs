#![allow(dead_code)]

pub mod mock_transport;
pub mod recording_diagnostic;

use self::mock_transport::MockTransport;
use self::recording_diagnostic::RecordingDiagnostic;
use mailroom::{MailerService, SmtpConfig};
use std::sync::Arc;
use std::time::Duration;

/// A configuration that lets messages through and keeps the idle timer far
/// away from tests that run on the real clock.
pub fn test_config() -> SmtpConfig {
    SmtpConfig {
        enabled: true,
        host: "smtp.example.com".to_string(),
        from: "alerts@example.com".to_string(),
        idle_timeout: Duration::from_secs(3600),
        ..Default::default()
    }
}

/// Builds a service wired to a mock transport and a recording diagnostics
/// sink, returning handles to all three.
pub fn mock_service(
    config: SmtpConfig,
) -> (Arc<MailerService>, MockTransport, RecordingDiagnostic) {
    let transport = MockTransport::new();
    let diag = RecordingDiagnostic::new();
    let service = Arc::new(MailerService::with_transport(
        config,
        Arc::new(transport.clone()),
        Arc::new(diag.clone()),
    ));
    (service, transport, diag)
}

/// Polls a condition until it holds, panicking after five seconds. The short
/// sleep keeps this compatible with `tokio::time::pause` tests, where each
/// iteration advances the virtual clock by one millisecond.
pub async fn wait_for<F: FnMut() -> bool>(mut condition: F, what: &str) {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    result.unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}
