//! Tenant-partitioned document storage.
//!
//! `KvStore` is the raw backend (memory or DynamoDB). `Record` declares how a
//! domain type is keyed and `Repo<T>` provides typed CRUD on top of a backend.
//! Keys follow `{prefix}{id}`, e.g. `part:4f1c...` or `cart:sess-123`.

pub mod dynamo;
pub mod memory;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::core::models::{
    Accessory, Brand, Cart, ContactMessage, Customer, DeviceModel, DeviceSeries, Order, Part,
    Quote, Repair, WishlistEntry,
};
use crate::errors::ShopError;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// Raw key/value backend. Values are JSON documents.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, tenant: &str, key: &str) -> Result<Option<String>, ShopError>;

    async fn put(&self, tenant: &str, key: &str, value: String) -> Result<(), ShopError>;

    /// Returns whether a value was removed.
    async fn delete(&self, tenant: &str, key: &str) -> Result<bool, ShopError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, sorted by key.
    async fn scan(&self, tenant: &str, prefix: &str) -> Result<Vec<(String, String)>, ShopError>;
}

/// A domain type stored as one document.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key prefix, including the trailing `:`.
    const PREFIX: &'static str;
    /// Human readable name used in error messages.
    const NAME: &'static str;

    fn key_value(&self) -> String;
}

/// Typed CRUD for one record type within one tenant.
pub struct Repo<T: Record> {
    kv: Arc<dyn KvStore>,
    tenant: String,
    _phantom: PhantomData<T>,
}

impl<T: Record> Repo<T> {
    pub fn new(kv: Arc<dyn KvStore>, tenant: &str) -> Self {
        Self {
            kv,
            tenant: tenant.to_string(),
            _phantom: PhantomData,
        }
    }

    fn make_key(id: &str) -> String {
        format!("{}{}", T::PREFIX, id)
    }

    fn decode(raw: &str) -> Result<T, ShopError> {
        serde_json::from_str(raw)
            .map_err(|e| ShopError::StorageError(format!("deserialize {}: {}", T::NAME, e)))
    }

    fn encode(record: &T) -> Result<String, ShopError> {
        serde_json::to_string(record)
            .map_err(|e| ShopError::StorageError(format!("serialize {}: {}", T::NAME, e)))
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, ShopError> {
        match self.kv.get(&self.tenant, &Self::make_key(id)).await? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get_or_err(&self, id: &str) -> Result<T, ShopError> {
        self.get(id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("{} '{}' not found", T::NAME, id)))
    }

    pub async fn list(&self) -> Result<Vec<T>, ShopError> {
        self.list_prefix("").await
    }

    /// Records whose id starts with `id_prefix`.
    pub async fn list_prefix(&self, id_prefix: &str) -> Result<Vec<T>, ShopError> {
        let entries = self
            .kv
            .scan(&self.tenant, &Self::make_key(id_prefix))
            .await?;
        entries.iter().map(|(_, raw)| Self::decode(raw)).collect()
    }

    /// Store a new record, failing if the key is taken.
    pub async fn insert(&self, record: T) -> Result<T, ShopError> {
        let key = Self::make_key(&record.key_value());
        if self.kv.get(&self.tenant, &key).await?.is_some() {
            return Err(ShopError::Conflict(format!(
                "{} '{}' already exists",
                T::NAME,
                record.key_value()
            )));
        }
        self.kv.put(&self.tenant, &key, Self::encode(&record)?).await?;
        Ok(record)
    }

    /// Create or overwrite.
    pub async fn save(&self, record: T) -> Result<T, ShopError> {
        let key = Self::make_key(&record.key_value());
        self.kv.put(&self.tenant, &key, Self::encode(&record)?).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ShopError> {
        if self.kv.delete(&self.tenant, &Self::make_key(id)).await? {
            Ok(())
        } else {
            Err(ShopError::NotFound(format!("{} '{}' not found", T::NAME, id)))
        }
    }
}

/// New random id for a record.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short uppercase code suitable for ticket and order numbers.
#[must_use]
pub fn short_code(len: usize) -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .to_ascii_uppercase()
        .chars()
        .take(len)
        .collect()
}

macro_rules! record {
    ($ty:ty, $prefix:literal, $name:literal, |$r:ident| $key:expr) => {
        impl Record for $ty {
            const PREFIX: &'static str = $prefix;
            const NAME: &'static str = $name;

            fn key_value(&self) -> String {
                let $r = self;
                $key
            }
        }
    };
}

record!(Brand, "brand:", "brand", |r| r.id.clone());
record!(DeviceSeries, "series:", "series", |r| r.id.clone());
record!(DeviceModel, "model:", "device model", |r| r.id.clone());
record!(Part, "part:", "part", |r| r.id.clone());
record!(Accessory, "accessory:", "accessory", |r| r.id.clone());
record!(Customer, "customer:", "customer", |r| r.id.clone());
record!(Repair, "repair:", "repair", |r| r.id.clone());
record!(Quote, "quote:", "quote", |r| r.id.clone());
record!(Cart, "cart:", "cart", |r| r.session_id.clone());
record!(Order, "order:", "order", |r| r.id.clone());
record!(ContactMessage, "contact:", "contact message", |r| r.id.clone());
// One wishlist entry per session and item; listing a session scans `{session}/`.
record!(WishlistEntry, "wishlist:", "wishlist entry", |r| format!(
    "{}/{}",
    r.session_id, r.item_id
));
