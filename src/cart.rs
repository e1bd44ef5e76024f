//! Per-session shopping cart, persisted so it survives navigation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::core::models::{Cart, CartItem, ItemKind};
use crate::errors::ShopError;
use crate::inventory::find_sellable;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub kind: ItemKind,
    pub item_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub cart: Cart,
    pub item_count: u32,
    pub subtotal_cents: i64,
}

impl From<Cart> for CartSummary {
    fn from(cart: Cart) -> Self {
        Self {
            item_count: cart.item_count(),
            subtotal_cents: cart.subtotal_cents(),
            cart,
        }
    }
}

pub async fn get(state: &AppState, tenant: &str, session_id: &str) -> Result<Cart, ShopError> {
    Ok(state
        .carts(tenant)
        .get(session_id)
        .await?
        .unwrap_or_else(|| Cart::empty(session_id)))
}

pub async fn summary(
    state: &AppState,
    tenant: &str,
    session_id: &str,
) -> Result<CartSummary, ShopError> {
    Ok(get(state, tenant, session_id).await?.into())
}

async fn save(state: &AppState, tenant: &str, mut cart: Cart) -> Result<CartSummary, ShopError> {
    cart.updated_at = Utc::now();
    Ok(state.carts(tenant).save(cart).await?.into())
}

/// Add an item, merging with an existing line.
///
/// Refused when the item is out of stock or the cart would hold more than is in stock.
pub async fn add_item(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    request: &AddToCart,
) -> Result<CartSummary, ShopError> {
    if request.quantity == 0 {
        return Err(ShopError::Validation("quantity must be at least 1".to_string()));
    }
    let item = find_sellable(state, tenant, request.kind, &request.item_id).await?;
    if !item.active {
        return Err(ShopError::NotFound(format!("item '{}' not found", item.id)));
    }
    if item.in_stock == 0 {
        return Err(ShopError::OutOfStock(format!("{} is out of stock", item.name)));
    }

    let mut cart = get(state, tenant, session_id).await?;
    let already = cart
        .items
        .iter()
        .find(|l| l.kind == request.kind && l.item_id == request.item_id)
        .map_or(0, |l| l.quantity);
    let wanted = already.saturating_add(request.quantity);
    if wanted > item.in_stock {
        return Err(ShopError::Validation(format!(
            "only {} of {} available",
            item.in_stock, item.name
        )));
    }

    match cart
        .items
        .iter_mut()
        .find(|l| l.kind == request.kind && l.item_id == request.item_id)
    {
        Some(line) => {
            line.quantity = wanted;
            line.unit_price_cents = item.price_cents;
            line.name = item.name;
        }
        None => cart.items.push(CartItem {
            kind: item.kind,
            item_id: item.id,
            name: item.name,
            unit_price_cents: item.price_cents,
            quantity: request.quantity,
        }),
    }

    info!(tenant, session_id, item_id = %request.item_id, quantity = wanted, "Cart item added");
    save(state, tenant, cart).await
}

/// Set a line's quantity; zero removes the line.
pub async fn update_quantity(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    item_id: &str,
    quantity: u32,
) -> Result<CartSummary, ShopError> {
    let mut cart = get(state, tenant, session_id).await?;
    let Some(pos) = cart.items.iter().position(|l| l.item_id == item_id) else {
        return Err(ShopError::NotFound(format!("item '{item_id}' is not in the cart")));
    };
    if quantity == 0 {
        cart.items.remove(pos);
        return save(state, tenant, cart).await;
    }

    let item = find_sellable(state, tenant, cart.items[pos].kind, item_id).await?;
    if quantity > item.in_stock {
        return Err(ShopError::Validation(format!(
            "only {} of {} available",
            item.in_stock, item.name
        )));
    }
    cart.items[pos].quantity = quantity;
    cart.items[pos].unit_price_cents = item.price_cents;
    save(state, tenant, cart).await
}

pub async fn remove_item(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    item_id: &str,
) -> Result<CartSummary, ShopError> {
    let mut cart = get(state, tenant, session_id).await?;
    let before = cart.items.len();
    cart.items.retain(|l| l.item_id != item_id);
    if cart.items.len() == before {
        return Err(ShopError::NotFound(format!("item '{item_id}' is not in the cart")));
    }
    save(state, tenant, cart).await
}

pub async fn clear(state: &AppState, tenant: &str, session_id: &str) -> Result<(), ShopError> {
    match state.carts(tenant).delete(session_id).await {
        Ok(()) | Err(ShopError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
