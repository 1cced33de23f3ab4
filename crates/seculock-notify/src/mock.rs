//! Mock transport that records deliveries.

use crate::message::Notification;
use crate::transport::{Envelope, MailTransport};
use seculock_core::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub envelope: Envelope,
    pub notification: Notification,
}

#[derive(Debug, Default)]
struct MockTransportState {
    sent: Vec<SentMail>,
    failing: bool,
    attempts: usize,
    delay: Option<Duration>,
}

fn lock(state: &Mutex<MockTransportState>) -> MutexGuard<'_, MockTransportState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock mail transport.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    /// Create a transport and the handle that inspects its outbox.
    pub fn new() -> (Self, MockOutbox) {
        let state = Arc::new(Mutex::new(MockTransportState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockOutbox { state },
        )
    }
}

impl MailTransport for MockTransport {
    async fn deliver(&self, envelope: &Envelope, notification: &Notification) -> Result<()> {
        let delay = {
            let mut state = lock(&self.state);
            state.attempts += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        if state.failing {
            return Err(Error::Delivery("relay rejected message".into()));
        }
        state.sent.push(SentMail {
            envelope: envelope.clone(),
            notification: notification.clone(),
        });
        Ok(())
    }
}

/// Handle for inspecting and steering a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockOutbox {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockOutbox {
    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<SentMail> {
        lock(&self.state).sent.clone()
    }

    /// Delivered notifications with the given subject.
    pub fn with_subject(&self, subject: &str) -> Vec<SentMail> {
        lock(&self.state)
            .sent
            .iter()
            .filter(|mail| mail.notification.subject == subject)
            .cloned()
            .collect()
    }

    /// Delivery attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        lock(&self.state).attempts
    }

    /// Make deliveries fail.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    /// Delay every delivery (for timeout tests).
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }
}
