use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use super::{EmailMessage, EmailSender};
use crate::errors::ShopError;

/// Sends through Amazon SES (v2 API).
pub struct SesSender {
    client: SesClient,
}

impl SesSender {
    pub async fn from_env() -> Self {
        let shared = aws_config::from_env().load().await;
        Self {
            client: SesClient::new(&shared),
        }
    }

    #[must_use]
    pub fn new(client: SesClient) -> Self {
        Self { client }
    }
}

fn utf8(data: &str) -> Result<Content, ShopError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| ShopError::EmailError(format!("ses content: {e}")))
}

#[async_trait]
impl EmailSender for SesSender {
    async fn send(&self, message: &EmailMessage) -> Result<String, ShopError> {
        let destination = Destination::builder()
            .set_to_addresses(Some(message.to.clone()))
            .build();
        let body = Body::builder()
            .html(utf8(&message.html)?)
            .text(utf8(&message.text)?)
            .build();
        let simple = Message::builder()
            .subject(utf8(&message.subject)?)
            .body(body)
            .build();

        let mut request = self
            .client
            .send_email()
            .from_email_address(&message.from)
            .destination(destination)
            .content(EmailContent::builder().simple(simple).build());
        if let Some(reply_to) = &message.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        let out = request
            .send()
            .await
            .map_err(|e| ShopError::EmailError(format!("ses send_email: {e:?}")))?;
        Ok(out.message_id().unwrap_or_default().to_string())
    }

    fn provider_name(&self) -> &'static str {
        "ses"
    }
}
