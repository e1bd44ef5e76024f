use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KvStore;
use crate::errors::ShopError;

/// In-process store used for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<(String, String), String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, tenant: &str, key: &str) -> Result<Option<String>, ShopError> {
        let data = self.data.read().await;
        Ok(data.get(&(tenant.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, tenant: &str, key: &str, value: String) -> Result<(), ShopError> {
        let mut data = self.data.write().await;
        data.insert((tenant.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, tenant: &str, key: &str) -> Result<bool, ShopError> {
        let mut data = self.data.write().await;
        Ok(data.remove(&(tenant.to_string(), key.to_string())).is_some())
    }

    async fn scan(&self, tenant: &str, prefix: &str) -> Result<Vec<(String, String)>, ShopError> {
        let data = self.data.read().await;
        let start = (tenant.to_string(), prefix.to_string());
        Ok(data
            .range(start..)
            .take_while(|((t, k), _)| t == tenant && k.starts_with(prefix))
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_is_tenant_and_prefix_scoped() {
        let store = MemoryStore::new();
        store.put("a", "part:1", "{}".into()).await.unwrap();
        store.put("a", "part:2", "{}".into()).await.unwrap();
        store.put("a", "quote:1", "{}".into()).await.unwrap();
        store.put("b", "part:3", "{}".into()).await.unwrap();

        let keys: Vec<String> = store
            .scan("a", "part:")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["part:1", "part:2"]);

        assert!(store.delete("a", "part:1").await.unwrap());
        assert!(!store.delete("a", "part:1").await.unwrap());
        assert_eq!(store.get("b", "part:3").await.unwrap().as_deref(), Some("{}"));
    }
}
