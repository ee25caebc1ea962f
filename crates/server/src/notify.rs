//! Outbound email notifications.
//!
//! The monitor and the admin endpoints talk to a [`Notifier`] rather than to
//! lettre directly; [`SmtpNotifier`] is the production implementation with a
//! bounded per-send timeout.

use crate::error::NotifyError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;

/// A single plain-text email ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError>;
}

/// Lettre-backed notifier. A timeout counts as a transport failure: the
/// caller leaves state untouched and the next pass retries.
pub struct SmtpNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(
        mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
        from: String,
        timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            from,
            timeout,
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotifyError> {
        let from = self
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidRecipient(self.from.clone()))?;
        let to = email
            .to
            .parse()
            .map_err(|_| NotifyError::InvalidRecipient(email.to.clone()))?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.text)
            .map_err(|e| NotifyError::InvalidRecipient(e.to_string()))?;

        match tokio::time::timeout(self.timeout, self.mailer.send(message)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(NotifyError::Transport(e)),
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}
