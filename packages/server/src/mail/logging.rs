use async_trait::async_trait;
use tracing::info;

use super::{EmailMessage, MailError, Mailer};

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Email (not delivered)");
        Ok(())
    }
}
