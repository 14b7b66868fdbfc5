//! The mail service: lifecycle control, dispatch API, and reconfiguration.
//!
//! `MailerService` owns the current configuration snapshot and the channels
//! into the connection worker. `open` spawns the worker; `close` shuts the
//! dispatch queue and waits for the worker to drain it and release any open
//! connection. Both are idempotent.

use crate::config::SmtpConfig;
use crate::diagnostics::Diagnostic;
use crate::message::OutboundMessage;
use crate::transport::{SmtpTransport, Transport};
use crate::worker::ConnectionWorker;
use anyhow::Result;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Errors surfaced synchronously by [`MailerService::send_mail`].
///
/// Anything that fails only during actual transmission is reported to the
/// [`Diagnostic`] sink instead; delivery past the hand-off is best-effort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The current configuration snapshot has `enabled = false`.
    #[error("smtp service is not enabled")]
    Disabled,
    /// Neither the call nor the snapshot supplied any recipients.
    #[error("not sending email, no recipients defined")]
    NoRecipients,
    /// The service is closed; the dispatch queue no longer accepts messages.
    #[error("smtp service is closed")]
    Closed,
}

/// Errors from the loosely-typed [`MailerService::update`] entry point.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("expected exactly one configuration value, got {0}")]
    UnexpectedCount(usize),
    #[error("configuration value has the wrong shape: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Parameters for a configuration-check test message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOptions {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Process-lifetime lifecycle flag plus the worker plumbing it guards.
struct ServiceState {
    opened: bool,
    mail_tx: Option<mpsc::Sender<OutboundMessage>>,
    reload_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// Dispatches outbound email through a single connection-owning worker task.
pub struct MailerService {
    config: Arc<ArcSwap<SmtpConfig>>,
    transport: Arc<dyn Transport>,
    diag: Arc<dyn Diagnostic>,
    state: Mutex<ServiceState>,
}

impl MailerService {
    /// Creates a service that dials real SMTP servers.
    pub fn new(config: SmtpConfig, diag: Arc<dyn Diagnostic>) -> Self {
        Self::with_transport(config, Arc::new(SmtpTransport), diag)
    }

    /// Creates a service with an injected transport. Tests use this to
    /// substitute a mock that counts connections and records messages.
    pub fn with_transport(
        config: SmtpConfig,
        transport: Arc<dyn Transport>,
        diag: Arc<dyn Diagnostic>,
    ) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            transport,
            diag,
            state: Mutex::new(ServiceState {
                opened: false,
                mail_tx: None,
                reload_tx: None,
                worker: None,
            }),
        }
    }

    /// Returns the current configuration snapshot.
    pub fn config(&self) -> Arc<SmtpConfig> {
        self.config.load_full()
    }

    /// Whether all alerts should trigger an email. Read by the alert routing
    /// layer, not by the dispatch core.
    pub fn global(&self) -> bool {
        self.config.load().global
    }

    /// Whether alerts should only fire on state changes. Read by the alert
    /// routing layer, not by the dispatch core.
    pub fn state_changes_only(&self) -> bool {
        self.config.load().state_changes_only
    }

    /// Starts the connection worker. Idempotent; returns immediately without
    /// dialing anything - connections are established lazily on the first
    /// message.
    pub async fn open(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.opened {
            return Ok(());
        }
        state.opened = true;

        // Capacity one: the tokio equivalent of a rendezvous channel. A
        // sender waits whenever a message is already queued, which keeps at
        // most one message in flight between callers and the worker.
        let (mail_tx, mail_rx) = mpsc::channel(1);
        let (reload_tx, reload_rx) = mpsc::channel(1);
        let worker = ConnectionWorker::new(
            self.config.clone(),
            self.transport.clone(),
            self.diag.clone(),
            mail_rx,
            reload_rx,
        );
        state.mail_tx = Some(mail_tx);
        state.reload_tx = Some(reload_tx);
        state.worker = Some(tokio::spawn(worker.run()));
        debug!("mailer opened");
        Ok(())
    }

    /// Stops the connection worker. Idempotent; closes the dispatch queue and
    /// blocks until the worker has drained it and released any open
    /// connection, so no connection resource outlives the service.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.opened {
            return Ok(());
        }
        state.opened = false;

        // Dropping the senders closes both channels; the worker drains the
        // queue, closes its connection, and exits.
        state.mail_tx = None;
        state.reload_tx = None;
        if let Some(worker) = state.worker.take() {
            if let Err(e) = worker.await {
                error!(error = %e, "connection worker panicked during shutdown");
            }
        }
        debug!("mailer closed");
        Ok(())
    }

    /// Queues one message for dispatch.
    ///
    /// Policy failures (service disabled, no recipients) and sends after
    /// `close` are returned synchronously. A successful return means the
    /// worker accepted the message, not that it was delivered; transmission
    /// failures go to the diagnostics sink. The call blocks while the worker
    /// is busy with an earlier message - intentional backpressure.
    pub async fn send_mail(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError> {
        let message = self.prepare_message(to, subject, body)?;
        let mail_tx = {
            let state = self.state.lock().await;
            state.mail_tx.clone().ok_or(SendError::Closed)?
        };
        mail_tx.send(message).await.map_err(|_| SendError::Closed)
    }

    fn prepare_message(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<OutboundMessage, SendError> {
        let config = self.config.load();
        if !config.enabled {
            return Err(SendError::Disabled);
        }
        let to = if to.is_empty() {
            config.to.clone()
        } else {
            to.to_vec()
        };
        if to.is_empty() {
            return Err(SendError::NoRecipients);
        }
        Ok(OutboundMessage {
            from: config.from.clone(),
            to,
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }

    /// Loosely-typed reconfiguration entry point for external update calls.
    ///
    /// Expects exactly one value that deserializes into an [`SmtpConfig`];
    /// anything else is rejected without touching the current snapshot or
    /// signalling the worker.
    pub async fn update(&self, mut values: Vec<serde_json::Value>) -> Result<(), UpdateError> {
        if values.len() != 1 {
            return Err(UpdateError::UnexpectedCount(values.len()));
        }
        let config: SmtpConfig =
            serde_json::from_value(values.remove(0)).map_err(UpdateError::Malformed)?;
        self.reconfigure(config).await;
        Ok(())
    }

    /// Replaces the configuration snapshot and, if the service is open, tells
    /// the worker to drop its connection so the next dial uses the new
    /// parameters.
    pub async fn reconfigure(&self, new_config: SmtpConfig) {
        self.config.store(Arc::new(new_config));
        let state = self.state.lock().await;
        if let Some(reload_tx) = &state.reload_tx {
            // Depth-one signal: a full slot means a reload is already pending
            // and the worker reads the latest snapshot when it gets there.
            let _ = reload_tx.try_send(());
        }
    }

    /// Default options for a configuration-check test message.
    pub fn test_options(&self) -> TestOptions {
        let config = self.config.load();
        TestOptions {
            to: config.to.clone(),
            subject: "test subject".to_string(),
            body: "test body".to_string(),
        }
    }

    /// Sends a test message through the normal dispatch path.
    pub async fn send_test(&self, options: TestOptions) -> Result<(), SendError> {
        self.send_mail(&options.to, &options.subject, &options.body)
            .await
    }
}
