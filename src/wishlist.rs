use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::core::models::{ItemKind, WishlistEntry};
use crate::errors::ShopError;
use crate::inventory::find_sellable;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistAdd {
    pub kind: ItemKind,
    pub item_id: String,
}

/// Wishlist row with the current name/price/stock of the item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub kind: ItemKind,
    pub item_id: String,
    pub name: String,
    pub price_cents: i64,
    pub in_stock: bool,
    pub added_at: chrono::DateTime<Utc>,
}

fn entry_key(session_id: &str, item_id: &str) -> String {
    format!("{session_id}/{item_id}")
}

/// Items in the session's wishlist, most recent first. Items removed from the
/// catalog are skipped.
pub async fn list(
    state: &AppState,
    tenant: &str,
    session_id: &str,
) -> Result<Vec<WishlistItem>, ShopError> {
    let mut entries = state
        .wishlist(tenant)
        .list_prefix(&format!("{session_id}/"))
        .await?;
    entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match find_sellable(state, tenant, entry.kind, &entry.item_id).await {
            Ok(item) if item.active => items.push(WishlistItem {
                kind: entry.kind,
                item_id: entry.item_id,
                name: item.name,
                price_cents: item.price_cents,
                in_stock: item.in_stock > 0,
                added_at: entry.added_at,
            }),
            Ok(_) | Err(ShopError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(items)
}

/// Adding an item twice keeps the original entry.
pub async fn add(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    request: &WishlistAdd,
) -> Result<WishlistEntry, ShopError> {
    let item = find_sellable(state, tenant, request.kind, &request.item_id).await?;
    let repo = state.wishlist(tenant);
    if let Some(existing) = repo.get(&entry_key(session_id, &item.id)).await? {
        return Ok(existing);
    }
    repo.save(WishlistEntry {
        session_id: session_id.to_string(),
        kind: item.kind,
        item_id: item.id,
        added_at: Utc::now(),
    })
    .await
}

pub async fn remove(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    item_id: &str,
) -> Result<(), ShopError> {
    state
        .wishlist(tenant)
        .delete(&entry_key(session_id, item_id))
        .await
}

pub async fn contains(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    item_id: &str,
) -> Result<bool, ShopError> {
    Ok(state
        .wishlist(tenant)
        .get(&entry_key(session_id, item_id))
        .await?
        .is_some())
}
