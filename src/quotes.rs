//! Customer quote requests and their follow-up by the shop.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::core::models::{Quote, QuoteStatus, Repair};
use crate::core::validate::{FieldErrors, clean_line, clean_text};
use crate::customers::{self, CustomerInput};
use crate::errors::ShopError;
use crate::repairs::{self, RepairInput};
use crate::store::new_id;

/// The storefront quote form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub device_model_id: Option<String>,
    #[serde(default)]
    pub device_label: String,
    #[serde(default)]
    pub issue: String,
    pub preferred_contact: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub estimated_cost_cents: i64,
    pub message: String,
    pub admin_notes: Option<String>,
}

/// firstName, lastName, email, phone and issue are all mandatory.
pub fn validate_request(request: &QuoteRequest) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("firstName", &request.first_name);
    errors.require("lastName", &request.last_name);
    errors.require_email("email", &request.email);
    errors.require_phone("phone", &request.phone);
    errors.require("issue", &request.issue);
    if request.device_model_id.is_none() && request.device_label.trim().is_empty() {
        errors.add("deviceLabel", "Please tell us which device needs repair");
    }
    errors.into_result()
}

/// Store a quote request and notify both the shop and the customer.
pub async fn submit(
    state: &AppState,
    tenant: &str,
    request: &QuoteRequest,
) -> Result<Quote, ShopError> {
    validate_request(request)?;

    let device_label = match &request.device_model_id {
        Some(model_id) if request.device_label.trim().is_empty() => {
            let model = state.models(tenant).get_or_err(model_id).await?;
            let brand = state.brands(tenant).get(&model.brand_id).await?;
            match brand {
                Some(b) => format!("{} {}", b.name, model.name),
                None => model.name,
            }
        }
        _ => clean_line(&request.device_label),
    };

    let now = Utc::now();
    let quote = Quote {
        id: new_id(),
        first_name: clean_line(&request.first_name),
        last_name: clean_line(&request.last_name),
        email: request.email.trim().to_string(),
        phone: request.phone.trim().to_string(),
        device_model_id: request.device_model_id.clone(),
        device_label,
        issue: clean_text(&request.issue),
        preferred_contact: request.preferred_contact.clone(),
        status: QuoteStatus::New,
        estimated_cost_cents: None,
        admin_notes: None,
        repair_id: None,
        created_at: now,
        updated_at: now,
    };
    let quote = state.quotes(tenant).insert(quote).await?;
    info!(tenant, quote_id = %quote.id, device = %quote.device_label, "Quote request received");

    state.email.notify_quote_received(&quote).await;
    Ok(quote)
}

/// All quotes, newest first.
pub async fn list(state: &AppState, tenant: &str) -> Result<Vec<Quote>, ShopError> {
    let mut quotes = state.quotes(tenant).list().await?;
    quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(quotes)
}

pub async fn get(state: &AppState, tenant: &str, id: &str) -> Result<Quote, ShopError> {
    state.quotes(tenant).get_or_err(id).await
}

/// Send the customer an estimate. Unlike submission, a failed email fails the call
/// so the admin knows the customer did not hear back.
pub async fn respond(
    state: &AppState,
    tenant: &str,
    id: &str,
    response: &QuoteResponse,
) -> Result<Quote, ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("message", &response.message);
    if response.estimated_cost_cents < 0 {
        errors.add("estimatedCostCents", "Cost cannot be negative");
    }
    errors.into_result()?;

    let mut quote = state.quotes(tenant).get_or_err(id).await?;
    if quote.status == QuoteStatus::Converted {
        return Err(ShopError::Conflict("quote was already converted to a repair".to_string()));
    }
    quote.estimated_cost_cents = Some(response.estimated_cost_cents);
    if response.admin_notes.is_some() {
        quote.admin_notes.clone_from(&response.admin_notes);
    }
    state.email.quote_response(&quote, &response.message).await?;

    quote.status = QuoteStatus::Responded;
    quote.updated_at = Utc::now();
    let quote = state.quotes(tenant).save(quote).await?;
    info!(tenant, quote_id = %quote.id, "Quote responded");
    Ok(quote)
}

pub async fn set_status(
    state: &AppState,
    tenant: &str,
    id: &str,
    status: QuoteStatus,
) -> Result<Quote, ShopError> {
    if status == QuoteStatus::Converted {
        return Err(ShopError::Validation(
            "use the convert action to turn a quote into a repair".to_string(),
        ));
    }
    let mut quote = state.quotes(tenant).get_or_err(id).await?;
    if quote.status == QuoteStatus::Converted {
        return Err(ShopError::Conflict("quote was already converted to a repair".to_string()));
    }
    quote.status = status;
    quote.updated_at = Utc::now();
    state.quotes(tenant).save(quote).await
}

/// Create (or reuse) the customer and open a repair for this quote.
pub async fn convert_to_repair(
    state: &AppState,
    tenant: &str,
    id: &str,
) -> Result<(Quote, Repair), ShopError> {
    let mut quote = state.quotes(tenant).get_or_err(id).await?;
    if quote.status == QuoteStatus::Converted {
        return Err(ShopError::Conflict("quote was already converted to a repair".to_string()));
    }

    let customer = customers::find_or_create(
        state,
        tenant,
        &CustomerInput {
            first_name: quote.first_name.clone(),
            last_name: quote.last_name.clone(),
            email: quote.email.clone(),
            phone: quote.phone.clone(),
            address: None,
            notes: None,
        },
    )
    .await?;

    let repair = repairs::create(
        state,
        tenant,
        &RepairInput {
            customer_id: customer.id,
            device_model_id: quote.device_model_id.clone(),
            device_label: quote.device_label.clone(),
            issue: quote.issue.clone(),
            estimated_cost_cents: quote.estimated_cost_cents,
            technician_notes: quote.admin_notes.clone(),
        },
    )
    .await?;

    quote.status = QuoteStatus::Converted;
    quote.repair_id = Some(repair.id.clone());
    quote.updated_at = Utc::now();
    let quote = state.quotes(tenant).save(quote).await?;
    info!(tenant, quote_id = %quote.id, repair_id = %repair.id, "Quote converted to repair");
    Ok((quote, repair))
}

pub async fn delete(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    state.quotes(tenant).delete(id).await
}
