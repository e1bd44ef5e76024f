//! Transactional email: provider-agnostic sender, HTML/text templates and the
//! shop-level `EmailService` that ties them to configuration.

pub mod mock;
pub mod resend;
pub mod service;
pub mod ses;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::core::config::{AppConfig, EmailProvider};
use crate::errors::ShopError;

pub use mock::MockSender;
pub use resend::ResendSender;
pub use service::EmailService;
pub use ses::SesSender;
pub use templates::RenderedEmail;

/// A fully addressed message ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    #[must_use]
    pub fn new(from: &str, to: &str, rendered: RenderedEmail) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            reply_to: None,
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        }
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.reply_to = Some(reply_to.to_string());
        self
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver the message; returns the provider's message id.
    async fn send(&self, message: &EmailMessage) -> Result<String, ShopError>;

    fn provider_name(&self) -> &'static str;
}

/// Pick the sender configured for this deployment.
///
/// # Errors
///
/// Returns an error if the Resend provider is selected without an API key.
pub async fn build_sender(config: &AppConfig) -> Result<Arc<dyn EmailSender>, ShopError> {
    let sender: Arc<dyn EmailSender> = match config.email_provider {
        EmailProvider::Ses => Arc::new(SesSender::from_env().await),
        EmailProvider::Resend => {
            let key = config.resend_api_key.as_deref().ok_or_else(|| {
                ShopError::ConfigError("RESEND_API_KEY is not set".to_string())
            })?;
            Arc::new(ResendSender::new(key))
        }
        EmailProvider::Mock => Arc::new(MockSender::new()),
    };
    info!(provider = sender.provider_name(), "Email sender configured");
    Ok(sender)
}
