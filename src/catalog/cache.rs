use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::CatalogItems;
use crate::store::Record;

/// Per-tenant marker kept in the shared store. Every catalog mutation writes
/// a fresh stamp, so instances that cached an older stamp reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStamp {
    pub stamp: String,
    pub updated_at: DateTime<Utc>,
}

impl CatalogStamp {
    pub const KEY: &'static str = "current";
}

impl Record for CatalogStamp {
    const PREFIX: &'static str = "catalog-stamp:";
    const NAME: &'static str = "catalog stamp";

    fn key_value(&self) -> String {
        Self::KEY.to_string()
    }
}

#[derive(Debug, Default)]
struct TenantLevels {
    stamp: String,
    levels: HashMap<String, CatalogItems>,
}

/// Unfiltered catalog levels per tenant, keyed by level (`brands`,
/// `series:{brandId}`, `models:{seriesId}`).
///
/// Entries are only served while the caller's stamp matches the one they were
/// stored under.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: RwLock<HashMap<String, TenantLevels>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, tenant: &str, stamp: &str, level_key: &str) -> Option<CatalogItems> {
        let entries = self.entries.read().await;
        let found = entries
            .get(tenant)
            .filter(|t| t.stamp == stamp)
            .and_then(|t| t.levels.get(level_key))
            .cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub async fn put(&self, tenant: &str, stamp: &str, level_key: &str, items: CatalogItems) {
        let mut entries = self.entries.write().await;
        let levels = entries.entry(tenant.to_string()).or_default();
        if levels.stamp != stamp {
            if !levels.levels.is_empty() {
                debug!(tenant, "Catalog stamp changed, dropping cached levels");
            }
            levels.stamp = stamp.to_string();
            levels.levels.clear();
        }
        levels.levels.insert(level_key.to_string(), items);
    }

    /// Drop this instance's entries for `tenant`.
    pub async fn invalidate(&self, tenant: &str) {
        let mut entries = self.entries.write().await;
        if let Some(dropped) = entries.remove(tenant) {
            debug!(tenant, levels = dropped.levels.len(), "Catalog cache invalidated");
        }
    }

    /// `(hits, misses)` since start.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
