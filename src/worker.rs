//! The connection worker: the sole task permitted to hold the SMTP
//! connection.
//!
//! Each loop iteration races three events and handles exactly one of them:
//! a reconfiguration signal, a message from the dispatch queue, or the idle
//! timer. The timer is armed fresh every iteration from the current
//! snapshot's idle timeout, so the idle window restarts after every event; it
//! is only armed while a connection is open, since there is nothing for it to
//! close otherwise. The worker exits once the dispatch queue is closed and
//! drained, releasing any open connection first.

use crate::config::SmtpConfig;
use crate::diagnostics::Diagnostic;
use crate::message::OutboundMessage;
use crate::transport::{MailConnection, Transport};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub(crate) struct ConnectionWorker {
    config: Arc<ArcSwap<SmtpConfig>>,
    transport: Arc<dyn Transport>,
    diag: Arc<dyn Diagnostic>,
    mail_rx: mpsc::Receiver<OutboundMessage>,
    reload_rx: mpsc::Receiver<()>,
}

impl ConnectionWorker {
    pub(crate) fn new(
        config: Arc<ArcSwap<SmtpConfig>>,
        transport: Arc<dyn Transport>,
        diag: Arc<dyn Diagnostic>,
        mail_rx: mpsc::Receiver<OutboundMessage>,
        reload_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            config,
            transport,
            diag,
            mail_rx,
            reload_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut conn: Option<Box<dyn MailConnection>> = None;

        loop {
            let idle_timeout = self.config.load().idle_timeout;
            tokio::select! {
                Some(()) = self.reload_rx.recv() => {
                    // Drop the connection so the next message dials with the
                    // new snapshot's parameters.
                    if let Some(mut open) = conn.take() {
                        if let Err(e) = open.close().await {
                            self.diag.error("error closing connection to old SMTP server", &e);
                        }
                    }
                    debug!("configuration reloaded");
                }
                message = self.mail_rx.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.handle_message(&mut conn, message).await;
                }
                _ = tokio::time::sleep(idle_timeout), if conn.is_some() => {
                    if let Some(mut open) = conn.take() {
                        if let Err(e) = open.close().await {
                            self.diag.error("error closing connection to SMTP server", &e);
                        }
                        metrics::counter!("mailroom_idle_closes_total").increment(1);
                        debug!("no mail sent within the idle timeout, connection closed");
                    }
                }
            }
        }

        // Queue closed and drained: release the connection before exiting.
        if let Some(mut open) = conn.take() {
            if let Err(e) = open.close().await {
                self.diag.error("error closing connection to SMTP server", &e);
            }
        }
        debug!("connection worker exited");
    }

    async fn handle_message(
        &self,
        conn: &mut Option<Box<dyn MailConnection>>,
        message: OutboundMessage,
    ) {
        if conn.is_none() {
            let config = self.config.load_full();
            match self.transport.dial(&config).await {
                Ok(open) => *conn = Some(open),
                Err(e) => {
                    metrics::counter!("mailroom_dial_failures_total").increment(1);
                    self.diag.error("error connecting to SMTP server", &e);
                    // The message is dropped, not requeued; the next message
                    // triggers a fresh dial.
                    return;
                }
            }
        }
        if let Some(open) = conn.as_mut() {
            match open.send(&message).await {
                Ok(()) => {
                    metrics::counter!("mailroom_mails_sent_total").increment(1);
                }
                Err(e) => {
                    metrics::counter!("mailroom_send_failures_total").increment(1);
                    self.diag.error("error sending", &e);
                    // Send errors are not assumed fatal; the connection stays
                    // open for subsequent messages.
                }
            }
        }
    }
}
