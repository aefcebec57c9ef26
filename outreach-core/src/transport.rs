//! Email transport seam.
//!
//! The pipeline hands one fully rendered message per recipient to the
//! transport; everything below that call (SMTP, provider API, retries
//! at the wire level) is an external collaborator's concern.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

/// One fully rendered message ready for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub html_body: String,
}

/// Transport-level failure with a human-readable message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider rejected the message.
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider did not answer in time.
    #[error("Transport timed out: {0}")]
    Timeout(String),
}

/// Seam for the external email provider.
///
/// One invocation per recipient; a failure for one recipient must not
/// affect any other recipient in the same job.
#[async_trait]
pub trait EmailTransport: Send + Sync + std::fmt::Debug {
    /// Attempt delivery of a single message.
    ///
    /// # Errors
    /// A [`TransportError`] carrying the provider's reason.
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError>;
}

/// Mock transport for testing.
///
/// Records every accepted message and can be scripted to fail for
/// specific recipient addresses.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    notify: Arc<Notify>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a transport failure for every send to `recipient`.
    ///
    /// # Panics
    /// Panics if the mutex is poisoned.
    pub fn fail_recipient(&self, recipient: &str) {
        self.failing
            .lock()
            .expect("MockTransport failing mutex poisoned")
            .insert(recipient.to_string());
    }

    /// All messages accepted so far.
    ///
    /// # Panics
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .clone()
    }

    /// Number of messages accepted so far.
    ///
    /// # Panics
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .len()
    }

    /// Wait until at least `expected` messages have been accepted.
    ///
    /// # Errors
    /// Returns an error if the timeout is reached before the expected
    /// count.
    pub async fn wait_for_count(
        &self,
        expected: usize,
        timeout: std::time::Duration,
    ) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, async {
            loop {
                // Register interest before checking, so a send between
                // the check and the await is not lost
                let notified = self.notify.notified();
                if self.sent_count() >= expected {
                    return;
                }
                notified.await;
            }
        })
        .await
    }
}

#[async_trait]
impl EmailTransport for MockTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        let failing = self
            .failing
            .lock()
            .expect("MockTransport failing mutex poisoned")
            .contains(&email.to);

        if failing {
            return Err(TransportError::Rejected(format!(
                "Scripted failure for {}",
                email.to
            )));
        }

        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .push(email.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Transport that logs instead of delivering. Used by the development
/// binary where no real provider is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        crate::outgoing!(
            level = INFO,
            "to = {}, subject = {:?}, bytes = {}",
            email.to,
            email.subject,
            email.html_body.len()
        );
        Ok(())
    }
}
