/// Mailer that records messages instead of sending them

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{Email, MailError, Mailer};

#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with a transport error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Messages addressed to `to`, oldest first
    pub fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }

    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent_to(to).pop()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }

        self.sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(email);
        Ok(())
    }
}
