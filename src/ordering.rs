//! Manual list ordering shared by the catalog and inventory.
//!
//! Records carry an `order` field; lists are shown sorted by (`order`, name)
//! and a reorder request rewrites `order` to `0..n` for one sibling group.

use std::collections::HashSet;

use crate::core::models::{Accessory, Brand, DeviceModel, DeviceSeries, Part};
use crate::errors::ShopError;
use crate::store::{Record, Repo};

pub trait Ordered {
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
    fn sort_name(&self) -> &str;
    fn id(&self) -> &str;
}

macro_rules! ordered {
    ($($ty:ty),*) => {$(
        impl Ordered for $ty {
            fn order(&self) -> u32 {
                self.order
            }
            fn set_order(&mut self, order: u32) {
                self.order = order;
            }
            fn sort_name(&self) -> &str {
                &self.name
            }
            fn id(&self) -> &str {
                &self.id
            }
        }
    )*};
}

ordered!(Brand, DeviceSeries, DeviceModel, Part, Accessory);

pub fn sort_ordered<T: Ordered>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.sort_name().to_lowercase().cmp(&b.sort_name().to_lowercase()))
    });
}

/// Position for a record appended to a sibling group.
#[must_use]
pub fn next_order<T: Ordered>(siblings: &[T]) -> u32 {
    siblings
        .iter()
        .map(|s| s.order().saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Check that `ids` names every sibling exactly once.
pub fn validate_reorder<T: Ordered>(siblings: &[T], ids: &[String]) -> Result<(), ShopError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ShopError::Validation(format!("duplicate id '{id}' in reorder")));
        }
    }
    let known: HashSet<&str> = siblings.iter().map(Ordered::id).collect();
    if let Some(unknown) = ids.iter().find(|id| !known.contains(id.as_str())) {
        return Err(ShopError::Validation(format!(
            "id '{unknown}' does not belong to this list"
        )));
    }
    if ids.len() != siblings.len() {
        return Err(ShopError::Validation(format!(
            "reorder must list all {} items, got {}",
            siblings.len(),
            ids.len()
        )));
    }
    Ok(())
}

/// Rewrite `order` for `siblings` following `ids`, saving only changed records.
pub async fn apply_order<T: Record + Ordered>(
    repo: &Repo<T>,
    siblings: Vec<T>,
    ids: &[String],
) -> Result<Vec<T>, ShopError> {
    validate_reorder(&siblings, ids)?;
    let mut by_id: std::collections::HashMap<String, T> = siblings
        .into_iter()
        .map(|s| (s.id().to_string(), s))
        .collect();

    let mut result = Vec::with_capacity(ids.len());
    for (position, id) in ids.iter().enumerate() {
        let Some(mut item) = by_id.remove(id) else {
            continue;
        };
        let position = u32::try_from(position)
            .map_err(|_| ShopError::Validation("too many items to reorder".to_string()))?;
        if item.order() != position {
            item.set_order(position);
            item = repo.save(item).await?;
        }
        result.push(item);
    }
    Ok(result)
}
