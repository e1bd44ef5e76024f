/// Repairshop - backend for a multi-tenant phone repair shop and accessory store.
///
/// The crate runs as one API Lambda behind API Gateway and serves both the
/// storefront (catalog, cart, checkout, quote requests, wishlist, contact form,
/// cookie consent) and the admin dashboard (repairs, customers, inventory,
/// quotes, orders).
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for serverless execution
/// - DynamoDB for tenant-partitioned storage (in-memory store for local runs)
/// - SES v2 or Resend for transactional email, with a logging mock fallback
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use repairshop::app::AppState;
/// use repairshop::core::config::AppConfig;
/// use repairshop::email::MockSender;
/// use repairshop::quotes::{self, QuoteRequest};
/// use repairshop::store::MemoryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     repairshop::setup_logging();
///
///     let config = AppConfig::local("owner@shop.test", "dummy_secret");
///     let state = AppState::with_parts(
///         config,
///         Arc::new(MemoryStore::new()),
///         Arc::new(MockSender::new()),
///     );
///
///     let quote = quotes::submit(
///         &state,
///         "default",
///         &QuoteRequest {
///             first_name: "Ada".into(),
///             last_name: "Lovelace".into(),
///             email: "ada@example.com".into(),
///             phone: "555-0100-22".into(),
///             device_label: "iPhone 13".into(),
///             issue: "Cracked screen".into(),
///             ..QuoteRequest::default()
///         },
///     )
///     .await?;
///     println!("Quote {} stored as {:?}", quote.id, quote.status);
///     Ok(())
/// }
/// ```
// Module declarations
pub mod api;
pub mod app;
pub mod cart;
pub mod catalog;
pub mod consent;
pub mod contact;
pub mod core;
pub mod customers;
pub mod dashboard;
pub mod email;
pub mod errors;
pub mod inventory;
pub mod ordering;
pub mod orders;
pub mod quotes;
pub mod repairs;
pub mod store;
pub mod wishlist;

pub use app::AppState;
pub use errors::ShopError;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Log level comes from `RUST_LOG` and defaults to `info`. Safe to call more
/// than once; later calls are no-ops.
///
/// # Example
///
/// ```
/// repairshop::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
