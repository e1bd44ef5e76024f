//! Repair work orders.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::core::models::{Customer, ItemKind, PartUsage, Repair, RepairStatus};
use crate::core::validate::FieldErrors;
use crate::errors::ShopError;
use crate::inventory::adjust_stock;
use crate::store::{new_id, short_code};

/// Maximum rows returned by `/api/search/repairs`.
pub const MAX_SEARCH_RESULTS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairInput {
    pub customer_id: String,
    pub device_model_id: Option<String>,
    pub device_label: String,
    pub issue: String,
    pub estimated_cost_cents: Option<i64>,
    pub technician_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairStatusUpdate {
    pub status: RepairStatus,
    pub final_cost_cents: Option<i64>,
    #[serde(default = "default_notify")]
    pub notify_customer: bool,
}

fn default_notify() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUsageRequest {
    pub part_id: String,
    pub quantity: u32,
}

/// A search row: the repair plus who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairHit {
    pub repair: Repair,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

fn ticket_number() -> String {
    format!("R-{}", short_code(6))
}

fn validate(input: &RepairInput) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("customerId", &input.customer_id);
    errors.require("deviceLabel", &input.device_label);
    errors.require("issue", &input.issue);
    if input.estimated_cost_cents.is_some_and(|c| c < 0) {
        errors.add("estimatedCostCents", "Cost cannot be negative");
    }
    errors.into_result()
}

/// All repairs, newest first.
pub async fn list(state: &AppState, tenant: &str) -> Result<Vec<Repair>, ShopError> {
    let mut repairs = state.repairs(tenant).list().await?;
    repairs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(repairs)
}

pub async fn get(state: &AppState, tenant: &str, id: &str) -> Result<Repair, ShopError> {
    state.repairs(tenant).get_or_err(id).await
}

pub async fn create(
    state: &AppState,
    tenant: &str,
    input: &RepairInput,
) -> Result<Repair, ShopError> {
    validate(input)?;
    state.customers(tenant).get_or_err(&input.customer_id).await?;
    let now = Utc::now();
    let repair = Repair {
        id: new_id(),
        ticket_number: ticket_number(),
        customer_id: input.customer_id.clone(),
        device_model_id: input.device_model_id.clone(),
        device_label: input.device_label.trim().to_string(),
        issue: input.issue.trim().to_string(),
        status: RepairStatus::Received,
        estimated_cost_cents: input.estimated_cost_cents,
        final_cost_cents: None,
        parts_used: Vec::new(),
        technician_notes: input.technician_notes.clone(),
        created_at: now,
        updated_at: now,
        completed_at: None,
    };
    let repair = state.repairs(tenant).insert(repair).await?;
    info!(tenant, repair_id = %repair.id, ticket = %repair.ticket_number, "Repair created");
    Ok(repair)
}

/// Edit details; status goes through [`update_status`].
pub async fn update(
    state: &AppState,
    tenant: &str,
    id: &str,
    input: &RepairInput,
) -> Result<Repair, ShopError> {
    validate(input)?;
    let mut repair = state.repairs(tenant).get_or_err(id).await?;
    if repair.customer_id != input.customer_id {
        state.customers(tenant).get_or_err(&input.customer_id).await?;
    }
    repair.customer_id.clone_from(&input.customer_id);
    repair.device_model_id.clone_from(&input.device_model_id);
    repair.device_label = input.device_label.trim().to_string();
    repair.issue = input.issue.trim().to_string();
    repair.estimated_cost_cents = input.estimated_cost_cents;
    repair.technician_notes.clone_from(&input.technician_notes);
    repair.updated_at = Utc::now();
    state.repairs(tenant).save(repair).await
}

/// Completed and Cancelled repairs are closed; any other move is allowed.
pub async fn update_status(
    state: &AppState,
    tenant: &str,
    id: &str,
    update: &RepairStatusUpdate,
) -> Result<Repair, ShopError> {
    let mut repair = state.repairs(tenant).get_or_err(id).await?;
    if repair.status == update.status {
        return Ok(repair);
    }
    if repair.status.is_terminal() {
        return Err(ShopError::Conflict(format!(
            "repair {} is already {}",
            repair.ticket_number,
            repair.status.label()
        )));
    }
    if update.final_cost_cents.is_some_and(|c| c < 0) {
        return Err(ShopError::Validation("Cost cannot be negative".to_string()));
    }

    let now = Utc::now();
    let previous = repair.status;
    repair.status = update.status;
    if update.final_cost_cents.is_some() {
        repair.final_cost_cents = update.final_cost_cents;
    }
    if update.status == RepairStatus::Completed {
        repair.completed_at = Some(now);
        if repair.final_cost_cents.is_none() {
            repair.final_cost_cents = repair.estimated_cost_cents;
        }
    }
    repair.updated_at = now;
    let repair = state.repairs(tenant).save(repair).await?;
    info!(
        tenant,
        repair_id = %repair.id,
        from = ?previous,
        to = ?repair.status,
        "Repair status updated"
    );

    if update.notify_customer {
        match state.customers(tenant).get(&repair.customer_id).await? {
            Some(customer) => state.email.notify_repair_status(&repair, &customer).await,
            None => info!(tenant, repair_id = %repair.id, "Repair has no customer to notify"),
        }
    }
    Ok(repair)
}

/// Take parts out of stock for a repair.
pub async fn record_part_usage(
    state: &AppState,
    tenant: &str,
    id: &str,
    usage: &PartUsageRequest,
) -> Result<Repair, ShopError> {
    if usage.quantity == 0 {
        return Err(ShopError::Validation("quantity must be at least 1".to_string()));
    }
    let mut repair = state.repairs(tenant).get_or_err(id).await?;
    if repair.status.is_terminal() {
        return Err(ShopError::Conflict(format!(
            "repair {} is closed",
            repair.ticket_number
        )));
    }
    let used = repair
        .parts_used
        .iter()
        .find(|p| p.part_id == usage.part_id)
        .map_or(0, |p| p.quantity);
    let total_used = used
        .checked_add(usage.quantity)
        .ok_or_else(|| ShopError::Validation("quantity too large".to_string()))?;
    adjust_stock(
        state,
        tenant,
        ItemKind::Part,
        &usage.part_id,
        -i64::from(usage.quantity),
        &format!("repair {}", repair.ticket_number),
    )
    .await
    .map_err(|e| match e {
        ShopError::Validation(msg) => ShopError::OutOfStock(msg),
        other => other,
    })?;

    match repair.parts_used.iter_mut().find(|p| p.part_id == usage.part_id) {
        Some(existing) => existing.quantity = total_used,
        None => repair.parts_used.push(PartUsage {
            part_id: usage.part_id.clone(),
            quantity: usage.quantity,
        }),
    }
    repair.updated_at = Utc::now();
    state.repairs(tenant).save(repair).await
}

pub async fn delete(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    state.repairs(tenant).delete(id).await?;
    info!(tenant, repair_id = %id, "Repair deleted");
    Ok(())
}

/// Digits of a query that looks like (part of) a phone number.
fn phone_digits(needle: &str) -> Option<String> {
    let phone_like = needle
        .chars()
        .all(|c| c.is_ascii_digit() || " -()+.".contains(c));
    let digits: String = needle.chars().filter(char::is_ascii_digit).collect();
    (phone_like && digits.len() >= 4).then_some(digits)
}

fn hit_matches(needle: &str, repair: &Repair, customer: Option<&Customer>) -> bool {
    let mut fields = vec![
        repair.ticket_number.to_lowercase(),
        repair.device_label.to_lowercase(),
        repair.issue.to_lowercase(),
    ];
    if let Some(c) = customer {
        fields.push(c.full_name().to_lowercase());
        fields.push(c.email.to_lowercase());
    }
    if fields.iter().any(|f| f.contains(needle)) {
        return true;
    }
    match (phone_digits(needle), customer) {
        (Some(digits), Some(c)) => c
            .phone
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .contains(&digits),
        _ => false,
    }
}

/// `/api/search/repairs?q=`: matches ticket, customer name/email/phone, device or issue.
pub async fn search(state: &AppState, tenant: &str, text: &str) -> Result<Vec<RepairHit>, ShopError> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let customer_repo = state.customers(tenant);
    let (repairs, customers) = futures::try_join!(list(state, tenant), customer_repo.list())?;

    let hits = repairs
        .into_iter()
        .filter_map(|repair| {
            let customer = customers.iter().find(|c| c.id == repair.customer_id);
            if !hit_matches(&needle, &repair, customer) {
                return None;
            }
            Some(RepairHit {
                customer_name: customer.map(Customer::full_name).unwrap_or_default(),
                customer_email: customer.map(|c| c.email.clone()).unwrap_or_default(),
                customer_phone: customer.map(|c| c.phone.clone()).unwrap_or_default(),
                repair,
            })
        })
        .take(MAX_SEARCH_RESULTS)
        .collect();
    Ok(hits)
}
