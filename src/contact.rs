use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::core::models::ContactMessage;
use crate::core::validate::{FieldErrors, clean_line, clean_text};
use crate::errors::ShopError;
use crate::store::new_id;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactReply {
    pub message: String,
}

pub async fn submit(
    state: &AppState,
    tenant: &str,
    request: &ContactRequest,
) -> Result<ContactMessage, ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("name", &request.name);
    errors.require_email("email", &request.email);
    errors.optional_phone("phone", request.phone.as_deref());
    errors.require("message", &request.message);
    errors.into_result()?;

    let subject = if request.subject.trim().is_empty() {
        "General enquiry".to_string()
    } else {
        clean_line(&request.subject)
    };
    let msg = ContactMessage {
        id: new_id(),
        name: clean_line(&request.name),
        email: request.email.trim().to_string(),
        phone: request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string),
        subject,
        message: clean_text(&request.message),
        responded: false,
        created_at: Utc::now(),
    };
    let msg = state.contacts(tenant).insert(msg).await?;
    info!(tenant, contact_id = %msg.id, "Contact message received");
    state.email.notify_contact_received(&msg).await;
    Ok(msg)
}

/// Messages, unanswered first, then newest first.
pub async fn list(state: &AppState, tenant: &str) -> Result<Vec<ContactMessage>, ShopError> {
    let mut messages = state.contacts(tenant).list().await?;
    messages.sort_by(|a, b| {
        a.responded
            .cmp(&b.responded)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    Ok(messages)
}

/// Email a response to the sender and mark the message answered.
pub async fn reply(
    state: &AppState,
    tenant: &str,
    id: &str,
    reply: &ContactReply,
) -> Result<ContactMessage, ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("message", &reply.message);
    errors.into_result()?;

    let mut msg = state.contacts(tenant).get_or_err(id).await?;
    state.email.contact_response(&msg, &reply.message).await?;
    msg.responded = true;
    let msg = state.contacts(tenant).save(msg).await?;
    info!(tenant, contact_id = %msg.id, "Contact message answered");
    Ok(msg)
}
