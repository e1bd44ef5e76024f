use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{Value, json};
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_retry::RetryIf;
use tracing::{error, warn};

use super::{EmailMessage, EmailSender};
use crate::errors::ShopError;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Retries after the first attempt.
const MAX_RETRIES: usize = 3;
/// Longest single attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for one `send`, retries included. Sends happen inside API
/// requests, which API Gateway cuts off at 29s.
pub const SEND_BUDGET: Duration = Duration::from_secs(12);

/// Delays before each retry: 100ms, 200ms, 400ms, never more than 2s.
///
/// tokio-retry raises the base to the attempt number, so a base of 2 with a
/// factor of 50 doubles from 100ms.
#[must_use]
pub fn backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(Duration::from_secs(2))
        .take(MAX_RETRIES)
}

/// Sends through the Resend HTTP API.
pub struct ResendSender {
    http: HttpClient,
    api_key: String,
    endpoint: String,
}

impl ResendSender {
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, RESEND_ENDPOINT)
    }

    #[must_use]
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self {
            http: HttpClient::builder()
                .timeout(ATTEMPT_TIMEOUT)
                .build()
                .unwrap_or_else(|e| {
                    warn!("Falling back to default HTTP client: {}", e);
                    HttpClient::new()
                }),
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    async fn send_once(&self, payload: &Value) -> Result<String, ShopError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(body
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string());
        }

        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%status, message, "Resend returned a retryable status");
            Err(ShopError::HttpError(format!("resend {status}: {message}")))
        } else {
            Err(ShopError::EmailError(format!("resend {status}: {message}")))
        }
    }
}

/// JSON body for `POST /emails`.
#[must_use]
pub fn build_payload(message: &EmailMessage) -> Value {
    let mut payload = json!({
        "from": message.from,
        "to": message.to,
        "subject": message.subject,
        "html": message.html,
        "text": message.text,
    });
    if let Some(reply_to) = &message.reply_to {
        payload["reply_to"] = Value::String(reply_to.clone());
    }
    payload
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, message: &EmailMessage) -> Result<String, ShopError> {
        let payload = build_payload(message);

        // Only transport failures and 5xx/429 are worth another attempt.
        let attempts = RetryIf::start(
            backoff().map(jitter),
            || self.send_once(&payload),
            |e: &ShopError| matches!(e, ShopError::HttpError(_)),
        );
        let result = match tokio::time::timeout(SEND_BUDGET, attempts).await {
            Ok(result) => result,
            Err(_) => Err(ShopError::HttpError(format!(
                "resend gave up after {}s",
                SEND_BUDGET.as_secs()
            ))),
        };
        result.map_err(|e| {
            error!("Resend delivery failed: {}", e);
            e
        })
    }

    fn provider_name(&self) -> &'static str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_includes_reply_to_only_when_set() {
        let msg = EmailMessage {
            from: "shop@example.com".into(),
            to: vec!["jane@example.com".into()],
            reply_to: None,
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
        };
        let payload = build_payload(&msg);
        assert_eq!(payload["to"][0], "jane@example.com");
        assert!(payload.get("reply_to").is_none());

        let payload = build_payload(&msg.with_reply_to("help@example.com"));
        assert_eq!(payload["reply_to"], "help@example.com");
    }

    #[test]
    fn test_backoff_stays_short() {
        let delays: Vec<Duration> = backoff().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
        assert!(SEND_BUDGET < Duration::from_secs(29));
    }
}
