use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{EmailMessage, EmailSender};
use crate::errors::ShopError;

/// Development sender: logs instead of delivering and keeps an outbox.
#[derive(Debug, Default)]
pub struct MockSender {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl MockSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far, oldest first.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.outbox.lock().await.clear();
    }
}

#[async_trait]
impl EmailSender for MockSender {
    async fn send(&self, message: &EmailMessage) -> Result<String, ShopError> {
        let mut outbox = self.outbox.lock().await;
        outbox.push(message.clone());
        let id = format!("mock-{}", outbox.len());
        info!(
            message_id = %id,
            to = ?message.to,
            subject = %message.subject,
            "Mock email sent"
        );
        #[cfg(feature = "debug-logs")]
        tracing::debug!(body = %message.text, "Mock email body");
        Ok(id)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
