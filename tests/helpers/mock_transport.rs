use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mailroom::{MailConnection, OutboundMessage, SmtpConfig, Transport};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A message the mock "delivered", tagged with the host it was dialed to.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub host: String,
    pub message: OutboundMessage,
}

/// A mock transport that counts dials, concurrently open connections, and
/// closes, and records every message it is asked to send.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    dial_attempts: AtomicUsize,
    open: AtomicUsize,
    max_open: AtomicUsize,
    closes: AtomicUsize,
    fail_dial: AtomicBool,
    fail_send: AtomicBool,
    send_delay_ms: AtomicUsize,
    sent: Mutex<Vec<SentMail>>,
    dialed: Mutex<Vec<SmtpConfig>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total dial attempts, failed ones included.
    pub fn dial_attempts(&self) -> usize {
        self.state.dial_attempts.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn open_count(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    /// The highest number of connections ever open at once.
    pub fn max_open(&self) -> usize {
        self.state.max_open.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.state.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.sent.lock().unwrap().len()
    }

    /// The configuration snapshots of every successful dial, in order.
    pub fn dialed(&self) -> Vec<SmtpConfig> {
        self.state.dialed.lock().unwrap().clone()
    }

    pub fn fail_dial(&self, fail: bool) {
        self.state.fail_dial.store(fail, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.state.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Makes every send take this long, for tests that need a window in
    /// which the worker is demonstrably busy.
    pub fn set_send_delay(&self, delay: Duration) {
        self.state
            .send_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dial(&self, config: &SmtpConfig) -> Result<Box<dyn MailConnection>> {
        self.state.dial_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_dial.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        let open = self.state.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_open.fetch_max(open, Ordering::SeqCst);
        self.state.dialed.lock().unwrap().push(config.clone());
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            host: config.host.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
    host: String,
}

#[async_trait]
impl MailConnection for MockConnection {
    async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let delay_ms = self.state.send_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
        }
        if self.state.fail_send.load(Ordering::SeqCst) {
            return Err(anyhow!("554 transaction failed"));
        }
        self.state.sent.lock().unwrap().push(SentMail {
            host: self.host.clone(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.open.fetch_sub(1, Ordering::SeqCst);
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
