//! Transactional email delivery.

mod logging;
mod memory;
mod resend;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use logging::LogMailer;
pub use memory::MemoryMailer;
pub use resend::ResendMailer;

use crate::config::{MailConfig, MailProvider};

/// A rendered email ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider is misconfigured: {0}")]
    Config(String),
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Build the mailer selected in configuration.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.provider {
        MailProvider::Log => Ok(Arc::new(LogMailer)),
        MailProvider::Resend => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| MailError::Config("mail.api_key is required for resend".into()))?;
            Ok(Arc::new(ResendMailer::new(
                config.api_url.clone(),
                api_key,
                config.from.clone(),
            )))
        }
    }
}

/// Send a message, logging instead of failing when delivery does not succeed.
///
/// Returns whether the message was delivered.
pub async fn send_best_effort(mailer: &dyn Mailer, message: EmailMessage) -> bool {
    let to = message.to.clone();
    let subject = message.subject.clone();
    match mailer.send(message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(to, subject, error = %e, "Failed to send email");
            false
        }
    }
}
