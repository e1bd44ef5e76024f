#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use repairshop::app::AppState;
use repairshop::core::config::AppConfig;
use repairshop::core::models::{Accessory, Customer, Part};
use repairshop::customers::{self, CustomerInput};
use repairshop::email::MockSender;
use repairshop::inventory;
use repairshop::store::{KvStore, MemoryStore};

pub const TENANT: &str = "shop-a";
pub const ADMIN_EMAIL: &str = "owner@shop.test";
pub const SECRET: &str = "test-admin-secret";
pub const SESSION: &str = "session-0001";

pub fn state() -> (AppState, Arc<MockSender>) {
    let mock = Arc::new(MockSender::new());
    let state = AppState::with_parts(
        AppConfig::local(ADMIN_EMAIL, SECRET),
        Arc::new(MemoryStore::new()),
        mock.clone(),
    );
    (state, mock)
}

/// A second instance over the same store, like another warm Lambda.
pub fn instance(store: Arc<dyn KvStore>) -> AppState {
    AppState::with_parts(
        AppConfig::local(ADMIN_EMAIL, SECRET),
        store,
        Arc::new(MockSender::new()),
    )
}

pub async fn seed_part(state: &AppState, name: &str, sku: &str, in_stock: u32) -> Part {
    let now = Utc::now();
    inventory::create_part(
        state,
        TENANT,
        Part {
            id: String::new(),
            name: name.to_string(),
            sku: sku.to_string(),
            category: "Screens".to_string(),
            compatible_model_ids: Vec::new(),
            price_cents: 8_999,
            cost_cents: 4_000,
            in_stock,
            low_stock_threshold: 2,
            supplier: None,
            order: 0,
            active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("part created")
}

pub async fn seed_accessory(state: &AppState, name: &str, in_stock: u32) -> Accessory {
    let now = Utc::now();
    inventory::create_accessory(
        state,
        TENANT,
        Accessory {
            id: String::new(),
            name: name.to_string(),
            slug: String::new(),
            description: "Tough case".to_string(),
            brand: None,
            category: "Cases".to_string(),
            price_cents: 1_500,
            compare_at_cents: None,
            in_stock,
            images: Vec::new(),
            featured: false,
            order: 0,
            active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("accessory created")
}

pub async fn seed_customer(state: &AppState, first: &str, last: &str, email: &str) -> Customer {
    customers::create(
        state,
        TENANT,
        &CustomerInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone: "(555) 010-4477".to_string(),
            address: None,
            notes: None,
        },
    )
    .await
    .expect("customer created")
}
