//! Outbound email seam.
//!
//! Delivery is a collaborator behind [`EmailSender`]: the service hands over
//! an address, a subject, and an HTML body and only cares about
//! success/failure. The default sender for local development and tests is
//! [`LogEmailSender`], which logs the payload and reports success.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Email delivery abstraction.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error; the caller decides whether a
    /// failed send aborts its flow.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Local dev sender that logs instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(to, subject, body_bytes = html_body.len(), "email send stub");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let sender = LogEmailSender;
        let sent = sender
            .send("a@x.com", "Confirm your email address", "<p>123456</p>")
            .await;
        assert!(sent.is_ok());
    }
}
