//! Parts and accessories: admin CRUD, stock keeping, manual ordering and the
//! storefront detail views.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::core::models::{Accessory, ItemKind, Part};
use crate::core::validate::{FieldErrors, slugify};
use crate::errors::ShopError;
use crate::ordering::{apply_order, next_order, sort_ordered};
use crate::store::new_id;

/// Accessories have no per-item threshold; at or below this count the page shows "only a few left".
pub const ACCESSORY_LOW_STOCK: u32 = 3;

/// Storefront detail page payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail<T> {
    pub item: T,
    pub can_add_to_cart: bool,
    pub low_stock: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub delta: i64,
    pub reason: Option<String>,
}

/// Basic identity of a sellable item, used by cart and wishlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sellable {
    pub kind: ItemKind,
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub in_stock: u32,
    pub active: bool,
}

/// Apply a signed delta to a stock count; the result may never be negative.
pub fn apply_delta(current: u32, delta: i64) -> Result<u32, ShopError> {
    let next = i64::from(current)
        .checked_add(delta)
        .ok_or_else(|| ShopError::Validation("stock change too large".to_string()))?;
    if next < 0 {
        return Err(ShopError::Validation(format!(
            "stock cannot go below zero (have {current}, change {delta})"
        )));
    }
    u32::try_from(next).map_err(|_| ShopError::Validation("stock count too large".to_string()))
}

/// $10M; keeps order totals far from `i64` limits.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

fn validate_price(errors: &mut FieldErrors, field: &str, cents: i64) {
    if cents < 0 {
        errors.add(field, "Price cannot be negative");
    } else if cents > MAX_PRICE_CENTS {
        errors.add(field, "Price is too large");
    }
}

// ============================================================================
// Parts
// ============================================================================

pub async fn list_parts(
    state: &AppState,
    tenant: &str,
    include_inactive: bool,
) -> Result<Vec<Part>, ShopError> {
    let mut parts: Vec<Part> = state
        .parts(tenant)
        .list()
        .await?
        .into_iter()
        .filter(|p| include_inactive || p.active)
        .collect();
    sort_ordered(&mut parts);
    Ok(parts)
}

/// Active parts that fit the given device model.
pub async fn parts_for_model(
    state: &AppState,
    tenant: &str,
    model_id: &str,
) -> Result<Vec<Part>, ShopError> {
    Ok(list_parts(state, tenant, false)
        .await?
        .into_iter()
        .filter(|p| p.compatible_model_ids.iter().any(|m| m == model_id))
        .collect())
}

pub async fn part_detail(
    state: &AppState,
    tenant: &str,
    id: &str,
) -> Result<ItemDetail<Part>, ShopError> {
    let part = state.parts(tenant).get_or_err(id).await?;
    if !part.active {
        return Err(ShopError::NotFound(format!("part '{id}' not found")));
    }
    Ok(ItemDetail {
        can_add_to_cart: part.in_stock > 0,
        low_stock: part.in_stock <= part.low_stock_threshold,
        item: part,
    })
}

fn validate_part(part: &Part) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("name", &part.name);
    errors.require("sku", &part.sku);
    errors.require("category", &part.category);
    validate_price(&mut errors, "priceCents", part.price_cents);
    validate_price(&mut errors, "costCents", part.cost_cents);
    errors.into_result()
}

/// SKUs are unique per tenant, ignoring case; `own_id` lets an update keep its SKU.
fn check_sku_free(existing: &[Part], sku: &str, own_id: &str) -> Result<(), ShopError> {
    if existing
        .iter()
        .any(|p| p.id != own_id && p.sku.eq_ignore_ascii_case(sku))
    {
        return Err(ShopError::Conflict(format!("SKU '{sku}' already exists")));
    }
    Ok(())
}

/// Accessory slugs are unique per tenant; `own_id` lets an update keep its slug.
fn check_accessory_slug_free(
    existing: &[Accessory],
    slug: &str,
    own_id: &str,
) -> Result<(), ShopError> {
    if existing.iter().any(|a| a.id != own_id && a.slug == slug) {
        return Err(ShopError::Conflict(format!(
            "accessory slug '{slug}' already exists"
        )));
    }
    Ok(())
}

pub async fn create_part(state: &AppState, tenant: &str, mut part: Part) -> Result<Part, ShopError> {
    validate_part(&part)?;
    let existing = state.parts(tenant).list().await?;
    check_sku_free(&existing, &part.sku, "")?;
    let now = Utc::now();
    part.id = new_id();
    part.order = next_order(&existing);
    part.created_at = now;
    part.updated_at = now;
    let part = state.parts(tenant).insert(part).await?;
    info!(tenant, part_id = %part.id, sku = %part.sku, "Part created");
    Ok(part)
}

pub async fn update_part(
    state: &AppState,
    tenant: &str,
    id: &str,
    mut part: Part,
) -> Result<Part, ShopError> {
    validate_part(&part)?;
    let current = state.parts(tenant).get_or_err(id).await?;
    let existing = state.parts(tenant).list().await?;
    check_sku_free(&existing, &part.sku, &current.id)?;
    part.id = current.id;
    part.order = current.order;
    part.created_at = current.created_at;
    part.updated_at = Utc::now();
    state.parts(tenant).save(part).await
}

pub async fn delete_part(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    state.parts(tenant).delete(id).await?;
    info!(tenant, part_id = %id, "Part deleted");
    Ok(())
}

pub async fn adjust_part_stock(
    state: &AppState,
    tenant: &str,
    id: &str,
    adjustment: &StockAdjustment,
) -> Result<Part, ShopError> {
    let mut part = state.parts(tenant).get_or_err(id).await?;
    part.in_stock = apply_delta(part.in_stock, adjustment.delta)?;
    part.updated_at = Utc::now();
    let part = state.parts(tenant).save(part).await?;
    info!(
        tenant,
        part_id = %part.id,
        delta = adjustment.delta,
        reason = adjustment.reason.as_deref().unwrap_or(""),
        in_stock = part.in_stock,
        "Part stock adjusted"
    );
    if part.in_stock <= part.low_stock_threshold {
        warn!(tenant, part_id = %part.id, in_stock = part.in_stock, "Part is low on stock");
    }
    Ok(part)
}

/// Parts at or under their low-stock threshold.
pub async fn low_stock_parts(state: &AppState, tenant: &str) -> Result<Vec<Part>, ShopError> {
    Ok(list_parts(state, tenant, false)
        .await?
        .into_iter()
        .filter(|p| p.in_stock <= p.low_stock_threshold)
        .collect())
}

/// `/api/parts/reorder`
pub async fn reorder_parts(
    state: &AppState,
    tenant: &str,
    ids: &[String],
) -> Result<Vec<Part>, ShopError> {
    let siblings = state.parts(tenant).list().await?;
    apply_order(&state.parts(tenant), siblings, ids).await
}

// ============================================================================
// Accessories
// ============================================================================

pub async fn list_accessories(
    state: &AppState,
    tenant: &str,
    include_inactive: bool,
) -> Result<Vec<Accessory>, ShopError> {
    let mut items: Vec<Accessory> = state
        .accessories(tenant)
        .list()
        .await?
        .into_iter()
        .filter(|a| include_inactive || a.active)
        .collect();
    sort_ordered(&mut items);
    Ok(items)
}

/// Storefront accessory page, looked up by id or slug.
pub async fn accessory_detail(
    state: &AppState,
    tenant: &str,
    id_or_slug: &str,
) -> Result<ItemDetail<Accessory>, ShopError> {
    let accessory = match state.accessories(tenant).get(id_or_slug).await? {
        Some(a) => Some(a),
        None => state
            .accessories(tenant)
            .list()
            .await?
            .into_iter()
            .find(|a| a.slug == id_or_slug),
    };
    let Some(accessory) = accessory.filter(|a| a.active) else {
        return Err(ShopError::NotFound(format!("accessory '{id_or_slug}' not found")));
    };
    Ok(ItemDetail {
        can_add_to_cart: accessory.in_stock > 0,
        low_stock: accessory.in_stock > 0 && accessory.in_stock <= ACCESSORY_LOW_STOCK,
        item: accessory,
    })
}

fn validate_accessory(accessory: &Accessory) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("name", &accessory.name);
    errors.require("category", &accessory.category);
    validate_price(&mut errors, "priceCents", accessory.price_cents);
    if let Some(compare) = accessory.compare_at_cents
        && compare < accessory.price_cents
    {
        errors.add("compareAtCents", "Compare-at price must not be below the price");
    }
    errors.into_result()
}

pub async fn create_accessory(
    state: &AppState,
    tenant: &str,
    mut accessory: Accessory,
) -> Result<Accessory, ShopError> {
    validate_accessory(&accessory)?;
    accessory.slug = if accessory.slug.trim().is_empty() {
        slugify(&accessory.name)
    } else {
        slugify(&accessory.slug)
    };
    let existing = state.accessories(tenant).list().await?;
    check_accessory_slug_free(&existing, &accessory.slug, "")?;
    let now = Utc::now();
    accessory.id = new_id();
    accessory.order = next_order(&existing);
    accessory.created_at = now;
    accessory.updated_at = now;
    let accessory = state.accessories(tenant).insert(accessory).await?;
    info!(tenant, accessory_id = %accessory.id, "Accessory created");
    Ok(accessory)
}

pub async fn update_accessory(
    state: &AppState,
    tenant: &str,
    id: &str,
    mut accessory: Accessory,
) -> Result<Accessory, ShopError> {
    validate_accessory(&accessory)?;
    let current = state.accessories(tenant).get_or_err(id).await?;
    accessory.slug = if accessory.slug.trim().is_empty() {
        current.slug.clone()
    } else {
        slugify(&accessory.slug)
    };
    let existing = state.accessories(tenant).list().await?;
    check_accessory_slug_free(&existing, &accessory.slug, &current.id)?;
    accessory.id = current.id;
    accessory.order = current.order;
    accessory.created_at = current.created_at;
    accessory.updated_at = Utc::now();
    state.accessories(tenant).save(accessory).await
}

pub async fn delete_accessory(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    state.accessories(tenant).delete(id).await?;
    info!(tenant, accessory_id = %id, "Accessory deleted");
    Ok(())
}

pub async fn adjust_accessory_stock(
    state: &AppState,
    tenant: &str,
    id: &str,
    adjustment: &StockAdjustment,
) -> Result<Accessory, ShopError> {
    let mut accessory = state.accessories(tenant).get_or_err(id).await?;
    accessory.in_stock = apply_delta(accessory.in_stock, adjustment.delta)?;
    accessory.updated_at = Utc::now();
    let accessory = state.accessories(tenant).save(accessory).await?;
    info!(
        tenant,
        accessory_id = %accessory.id,
        delta = adjustment.delta,
        in_stock = accessory.in_stock,
        "Accessory stock adjusted"
    );
    Ok(accessory)
}

pub async fn reorder_accessories(
    state: &AppState,
    tenant: &str,
    ids: &[String],
) -> Result<Vec<Accessory>, ShopError> {
    let siblings = state.accessories(tenant).list().await?;
    apply_order(&state.accessories(tenant), siblings, ids).await
}

// ============================================================================
// Shared by cart, checkout and wishlist
// ============================================================================

pub async fn find_sellable(
    state: &AppState,
    tenant: &str,
    kind: ItemKind,
    id: &str,
) -> Result<Sellable, ShopError> {
    Ok(match kind {
        ItemKind::Part => {
            let p = state.parts(tenant).get_or_err(id).await?;
            Sellable {
                kind,
                id: p.id,
                name: p.name,
                price_cents: p.price_cents,
                in_stock: p.in_stock,
                active: p.active,
            }
        }
        ItemKind::Accessory => {
            let a = state.accessories(tenant).get_or_err(id).await?;
            Sellable {
                kind,
                id: a.id,
                name: a.name,
                price_cents: a.price_cents,
                in_stock: a.in_stock,
                active: a.active,
            }
        }
    })
}

/// Change stock of any sellable item by `delta`.
pub async fn adjust_stock(
    state: &AppState,
    tenant: &str,
    kind: ItemKind,
    id: &str,
    delta: i64,
    reason: &str,
) -> Result<u32, ShopError> {
    let adjustment = StockAdjustment {
        delta,
        reason: Some(reason.to_string()),
    };
    match kind {
        ItemKind::Part => Ok(adjust_part_stock(state, tenant, id, &adjustment)
            .await?
            .in_stock),
        ItemKind::Accessory => Ok(adjust_accessory_stock(state, tenant, id, &adjustment)
            .await?
            .in_stock),
    }
}
