use std::sync::Mutex;

use async_trait::async_trait;

use super::{EmailMessage, MailError, Mailer};

/// Records messages in memory. Can be told to fail to exercise error paths.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: Mutex<bool>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut f) = self.fail.lock() {
            *f = fail;
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.fail.lock().map(|f| *f).unwrap_or(false) {
            return Err(MailError::Rejected {
                status: 503,
                body: "memory mailer set to fail".into(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}
