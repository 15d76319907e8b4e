/// Outgoing email
///
/// Services hand fully-rendered [`Email`]s to a [`Mailer`]. Delivery is
/// best-effort: [`dispatch`] awaits the send under a timeout, logs any
/// failure and reports success as a bool, so a broken mail server never
/// fails the request that triggered the mail.
///
/// # Implementations
///
/// - [`smtp::SmtpMailer`]: lettre async SMTP transport
/// - [`memory::RecordingMailer`]: keeps sent mail in memory (tests, local runs)
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use taskmate_shared::mail::{dispatch, templates, memory::RecordingMailer};
///
/// # async fn example() {
/// let mailer = RecordingMailer::new();
/// let email = templates::verification_email("a@x.io", "http://localhost:8080", 123456);
///
/// let delivered = dispatch(&mailer, email, Duration::from_secs(10)).await;
/// assert!(delivered);
/// # }
/// ```

pub mod memory;
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Rendered plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,

    pub subject: String,

    pub body: String,
}

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("mail delivery timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Sends `email`, giving up after `timeout`
pub async fn deliver(mailer: &dyn Mailer, email: Email, timeout: Duration) -> Result<(), MailError> {
    tokio::time::timeout(timeout, mailer.send(email))
        .await
        .map_err(|_| MailError::Timeout(timeout))?
}

/// Best-effort delivery; failures are logged and swallowed
///
/// Returns true if the mailer accepted the message.
pub async fn dispatch(mailer: &dyn Mailer, email: Email, timeout: Duration) -> bool {
    let to = email.to.clone();
    let subject = email.subject.clone();

    match deliver(mailer, email, timeout).await {
        Ok(()) => {
            debug!(to = %to, subject = %subject, "Email sent");
            true
        }
        Err(e) => {
            warn!(to = %to, subject = %subject, error = %e, "Email delivery failed");
            false
        }
    }
}
