use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::core::models::{Customer, Repair};
use crate::core::validate::FieldErrors;
use crate::errors::ShopError;
use crate::store::new_id;

/// Create/update payload; server-owned fields are not accepted from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}

fn validate(input: &CustomerInput) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("firstName", &input.first_name);
    errors.require("lastName", &input.last_name);
    errors.require_email("email", &input.email);
    errors.require_phone("phone", &input.phone);
    errors.into_result()
}

/// All customers sorted by last name, then first name.
pub async fn list(state: &AppState, tenant: &str) -> Result<Vec<Customer>, ShopError> {
    let mut customers = state.customers(tenant).list().await?;
    customers.sort_by(|a, b| {
        a.last_name
            .to_lowercase()
            .cmp(&b.last_name.to_lowercase())
            .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
    });
    Ok(customers)
}

pub async fn get(state: &AppState, tenant: &str, id: &str) -> Result<Customer, ShopError> {
    state.customers(tenant).get_or_err(id).await
}

pub async fn find_by_email(
    state: &AppState,
    tenant: &str,
    email: &str,
) -> Result<Option<Customer>, ShopError> {
    let email = email.trim();
    Ok(state
        .customers(tenant)
        .list()
        .await?
        .into_iter()
        .find(|c| c.email.eq_ignore_ascii_case(email)))
}

pub async fn create(
    state: &AppState,
    tenant: &str,
    input: &CustomerInput,
) -> Result<Customer, ShopError> {
    validate(input)?;
    if find_by_email(state, tenant, &input.email).await?.is_some() {
        return Err(ShopError::Conflict(format!(
            "a customer with email '{}' already exists",
            input.email.trim()
        )));
    }
    let now = Utc::now();
    let customer = Customer {
        id: new_id(),
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        email: input.email.trim().to_string(),
        phone: input.phone.trim().to_string(),
        address: input.address.clone(),
        notes: input.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    let customer = state.customers(tenant).insert(customer).await?;
    info!(tenant, customer_id = %customer.id, "Customer created");
    Ok(customer)
}

/// Returns the existing customer for this email or creates one.
pub async fn find_or_create(
    state: &AppState,
    tenant: &str,
    input: &CustomerInput,
) -> Result<Customer, ShopError> {
    match find_by_email(state, tenant, &input.email).await? {
        Some(existing) => Ok(existing),
        None => create(state, tenant, input).await,
    }
}

pub async fn update(
    state: &AppState,
    tenant: &str,
    id: &str,
    input: &CustomerInput,
) -> Result<Customer, ShopError> {
    validate(input)?;
    let mut customer = state.customers(tenant).get_or_err(id).await?;
    if let Some(other) = find_by_email(state, tenant, &input.email).await?
        && other.id != customer.id
    {
        return Err(ShopError::Conflict(format!(
            "email '{}' belongs to another customer",
            input.email.trim()
        )));
    }
    customer.first_name = input.first_name.trim().to_string();
    customer.last_name = input.last_name.trim().to_string();
    customer.email = input.email.trim().to_string();
    customer.phone = input.phone.trim().to_string();
    customer.address.clone_from(&input.address);
    customer.notes.clone_from(&input.notes);
    customer.updated_at = Utc::now();
    state.customers(tenant).save(customer).await
}

/// Repairs belonging to a customer, newest first.
pub async fn history(state: &AppState, tenant: &str, id: &str) -> Result<Vec<Repair>, ShopError> {
    state.customers(tenant).get_or_err(id).await?;
    let mut repairs: Vec<Repair> = state
        .repairs(tenant)
        .list()
        .await?
        .into_iter()
        .filter(|r| r.customer_id == id)
        .collect();
    repairs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(repairs)
}

/// Refused while the customer has a repair that is still open.
pub async fn delete(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    let open = history(state, tenant, id)
        .await?
        .iter()
        .filter(|r| !r.status.is_terminal())
        .count();
    if open > 0 {
        return Err(ShopError::Conflict(format!(
            "customer has {open} open repair(s)"
        )));
    }
    state.customers(tenant).delete(id).await?;
    info!(tenant, customer_id = %id, "Customer deleted");
    Ok(())
}
