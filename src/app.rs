use std::sync::Arc;

use tracing::info;

use crate::catalog::CatalogCache;
use crate::core::config::AppConfig;
use crate::core::models::{
    Accessory, Brand, Cart, ContactMessage, Customer, DeviceModel, DeviceSeries, Order, Part,
    Quote, Repair, WishlistEntry,
};
use crate::email::{self, EmailSender, EmailService};
use crate::errors::ShopError;
use crate::store::{DynamoStore, KvStore, MemoryStore, Record, Repo};

/// Everything a request handler needs, built once per cold start.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn KvStore>,
    pub email: EmailService,
    pub catalog_cache: CatalogCache,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the configured email provider cannot be built.
    pub async fn from_config(config: AppConfig) -> Result<Self, ShopError> {
        let store: Arc<dyn KvStore> = match &config.table_name {
            Some(table) => {
                info!(table = %table, "Using DynamoDB store");
                Arc::new(DynamoStore::from_env(table).await)
            }
            None => {
                info!("TABLE_NAME not set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        let sender = email::build_sender(&config).await?;
        Ok(Self::with_parts(config, store, sender))
    }

    #[must_use]
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn KvStore>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        let email = EmailService::new(&config, sender);
        Self {
            config,
            store,
            email,
            catalog_cache: CatalogCache::new(),
        }
    }

    #[must_use]
    pub fn repo<T: Record>(&self, tenant: &str) -> Repo<T> {
        Repo::new(Arc::clone(&self.store), tenant)
    }

    #[must_use]
    pub fn brands(&self, tenant: &str) -> Repo<Brand> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn series(&self, tenant: &str) -> Repo<DeviceSeries> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn models(&self, tenant: &str) -> Repo<DeviceModel> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn parts(&self, tenant: &str) -> Repo<Part> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn accessories(&self, tenant: &str) -> Repo<Accessory> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn customers(&self, tenant: &str) -> Repo<Customer> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn repairs(&self, tenant: &str) -> Repo<Repair> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn quotes(&self, tenant: &str) -> Repo<Quote> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn carts(&self, tenant: &str) -> Repo<Cart> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn orders(&self, tenant: &str) -> Repo<Order> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn wishlist(&self, tenant: &str) -> Repo<WishlistEntry> {
        self.repo(tenant)
    }

    #[must_use]
    pub fn contacts(&self, tenant: &str) -> Repo<ContactMessage> {
        self.repo(tenant)
    }
}
