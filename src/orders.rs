//! Checkout and order lifecycle.
//!
//! Payment is handled by an external provider; an order is created as
//! `Pending` and moved to `Paid` when the admin (or a provider webhook)
//! records the payment reference.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::cart;
use crate::core::models::{CartItem, ContactInfo, Order, OrderStatus};
use crate::core::validate::FieldErrors;
use crate::errors::ShopError;
use crate::inventory::{adjust_stock, find_sellable};
use crate::store::{new_id, short_code};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLookup {
    pub number: String,
    pub email: String,
}

/// Public view of an order for the customer-facing lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub number: String,
    pub status: OrderStatus,
    pub items: Vec<CartItem>,
    pub total_cents: i64,
    pub tracking_number: Option<String>,
}

impl From<&Order> for OrderReceipt {
    fn from(order: &Order) -> Self {
        Self {
            number: order.number.clone(),
            status: order.status,
            items: order.items.clone(),
            total_cents: order.total_cents,
            tracking_number: order.tracking_number.clone(),
        }
    }
}

/// Whether an order may move from `from` to `to`.
#[must_use]
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::{Cancelled, Delivered, Paid, Pending, Processing, Refunded, Shipped};
    match from {
        Pending => matches!(to, Paid | Cancelled),
        Paid => matches!(to, Processing | Shipped | Cancelled | Refunded),
        Processing => matches!(to, Shipped | Cancelled | Refunded),
        Shipped => matches!(to, Delivered | Refunded),
        Delivered => matches!(to, Refunded),
        Cancelled | Refunded => false,
    }
}

fn order_number() -> String {
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), short_code(6))
}

fn validate_checkout(request: &CheckoutRequest) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("firstName", &request.first_name);
    errors.require("lastName", &request.last_name);
    errors.require_email("email", &request.email);
    errors.require_phone("phone", &request.phone);
    errors.require("shippingAddress", &request.shipping_address);
    errors.into_result()
}

async fn release_stock(state: &AppState, tenant: &str, items: &[CartItem], reason: &str) {
    for item in items {
        if let Err(e) = adjust_stock(
            state,
            tenant,
            item.kind,
            &item.item_id,
            i64::from(item.quantity),
            reason,
        )
        .await
        {
            error!(tenant, item_id = %item.item_id, "Failed to restock item: {}", e);
        }
    }
}

/// `(subtotal, total)` in cents, or `None` if either overflows.
fn order_totals(lines: &[CartItem], shipping_cents: i64) -> Option<(i64, i64)> {
    let subtotal = lines.iter().try_fold(0_i64, |acc, line| {
        acc.checked_add(line.checked_line_total_cents()?)
    })?;
    Some((subtotal, subtotal.checked_add(shipping_cents)?))
}

/// Turn the session's cart into a `Pending` order, reserving stock.
pub async fn checkout(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    request: &CheckoutRequest,
) -> Result<Order, ShopError> {
    validate_checkout(request)?;
    let cart = cart::get(state, tenant, session_id).await?;
    if cart.items.is_empty() {
        return Err(ShopError::Validation("cart is empty".to_string()));
    }

    // Re-check prices and stock against the current inventory.
    let mut lines = Vec::with_capacity(cart.items.len());
    for line in &cart.items {
        let item = find_sellable(state, tenant, line.kind, &line.item_id).await?;
        if !item.active || item.in_stock < line.quantity {
            return Err(ShopError::OutOfStock(format!(
                "{} has only {} left",
                item.name, item.in_stock
            )));
        }
        lines.push(CartItem {
            kind: item.kind,
            item_id: item.id,
            name: item.name,
            unit_price_cents: item.price_cents,
            quantity: line.quantity,
        });
    }

    let shipping_cents = state.config.shipping_flat_cents;
    let (subtotal_cents, total_cents) = order_totals(&lines, shipping_cents)
        .ok_or_else(|| ShopError::Validation("order total is too large".to_string()))?;

    let mut reserved: Vec<CartItem> = Vec::with_capacity(lines.len());
    for line in &lines {
        let result = adjust_stock(
            state,
            tenant,
            line.kind,
            &line.item_id,
            -i64::from(line.quantity),
            "checkout",
        )
        .await;
        if let Err(e) = result {
            warn!(tenant, session_id, "Checkout stock reservation failed: {}", e);
            release_stock(state, tenant, &reserved, "checkout rollback").await;
            return Err(match e {
                ShopError::Validation(msg) => ShopError::OutOfStock(msg),
                other => other,
            });
        }
        reserved.push(line.clone());
    }

    let now = Utc::now();
    let order = Order {
        id: new_id(),
        number: order_number(),
        session_id: session_id.to_string(),
        contact: ContactInfo {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.trim().to_string(),
        },
        shipping_address: request.shipping_address.trim().to_string(),
        items: lines,
        subtotal_cents,
        shipping_cents,
        total_cents,
        status: OrderStatus::Pending,
        payment_reference: None,
        tracking_number: None,
        created_at: now,
        updated_at: now,
    };

    let order = match state.orders(tenant).insert(order).await {
        Ok(order) => order,
        Err(e) => {
            release_stock(state, tenant, &reserved, "checkout rollback").await;
            return Err(e);
        }
    };
    // The order is stored by now; a leftover cart is logged, not fatal.
    if let Err(e) = cart::clear(state, tenant, session_id).await {
        error!(
            tenant,
            session_id,
            order_id = %order.id,
            "Failed to clear cart after checkout: {}",
            e
        );
    }

    info!(
        tenant,
        order_id = %order.id,
        number = %order.number,
        total_cents = order.total_cents,
        "Order placed"
    );
    state.email.notify_order_placed(&order).await;
    Ok(order)
}

pub async fn update_status(
    state: &AppState,
    tenant: &str,
    id: &str,
    update: &StatusUpdate,
) -> Result<Order, ShopError> {
    let mut order = state.orders(tenant).get_or_err(id).await?;
    if order.status == update.status {
        return Ok(order);
    }
    if !can_transition(order.status, update.status) {
        return Err(ShopError::Conflict(format!(
            "order {} cannot move from {:?} to {:?}",
            order.number, order.status, update.status
        )));
    }
    if update.status == OrderStatus::Paid
        && update.payment_reference.is_none()
        && order.payment_reference.is_none()
    {
        return Err(ShopError::Validation(
            "paymentReference is required to mark an order paid".to_string(),
        ));
    }

    let previous = order.status;
    order.status = update.status;
    if let Some(reference) = &update.payment_reference {
        order.payment_reference = Some(reference.clone());
    }
    if let Some(tracking) = &update.tracking_number {
        order.tracking_number = Some(tracking.clone());
    }
    order.updated_at = Utc::now();
    let order = state.orders(tenant).save(order).await?;

    if order.status == OrderStatus::Cancelled {
        release_stock(state, tenant, &order.items, "order cancelled").await;
    }

    info!(
        tenant,
        order_id = %order.id,
        from = ?previous,
        to = ?order.status,
        "Order status updated"
    );
    state.email.notify_order_status(&order).await;
    Ok(order)
}

pub async fn get(state: &AppState, tenant: &str, id: &str) -> Result<Order, ShopError> {
    state.orders(tenant).get_or_err(id).await
}

/// All orders, newest first.
pub async fn list(state: &AppState, tenant: &str) -> Result<Vec<Order>, ShopError> {
    let mut orders = state.orders(tenant).list().await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// Customer lookup by order number; the email must match to avoid enumeration.
pub async fn lookup(
    state: &AppState,
    tenant: &str,
    query: &OrderLookup,
) -> Result<OrderReceipt, ShopError> {
    let orders = state.orders(tenant).list().await?;
    orders
        .iter()
        .find(|o| {
            o.number.eq_ignore_ascii_case(query.number.trim())
                && o.contact.email.eq_ignore_ascii_case(query.email.trim())
        })
        .map(OrderReceipt::from)
        .ok_or_else(|| ShopError::NotFound("no order matches that number and email".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        assert!(can_transition(OrderStatus::Pending, OrderStatus::Paid));
        assert!(can_transition(OrderStatus::Shipped, OrderStatus::Delivered));
        assert!(can_transition(OrderStatus::Delivered, OrderStatus::Refunded));
        assert!(!can_transition(OrderStatus::Pending, OrderStatus::Shipped));
        assert!(!can_transition(OrderStatus::Cancelled, OrderStatus::Paid));
        assert!(!can_transition(OrderStatus::Refunded, OrderStatus::Pending));
    }

    fn line(unit_price_cents: i64, quantity: u32) -> CartItem {
        CartItem {
            kind: crate::core::models::ItemKind::Accessory,
            item_id: "a".into(),
            name: "Case".into(),
            unit_price_cents,
            quantity,
        }
    }

    #[test]
    fn test_order_totals_refuse_overflow() {
        assert_eq!(
            order_totals(&[line(1_500, 2), line(250, 1)], 599),
            Some((3_250, 3_849))
        );
        assert_eq!(order_totals(&[line(i64::MAX, 2)], 0), None);
        assert_eq!(order_totals(&[line(i64::MAX, 1), line(1, 1)], 0), None);
        assert_eq!(order_totals(&[line(i64::MAX, 1)], 1), None);
    }

    #[test]
    fn test_order_numbers_are_dated() {
        let number = order_number();
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), "ORD-20240101-ABCDEF".len());
    }
}
