//! Route table. Storefront routes are open; admin routes need a bearer token.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::auth;
use super::helpers::{created, no_content, ok, with_cookie};
use super::parsing::Request;
use crate::app::AppState;
use crate::catalog::{self, CatalogQuery, ReorderRequest};
use crate::consent::{self, ConsentPreferences};
use crate::contact::{self, ContactReply, ContactRequest};
use crate::core::models::{
    Accessory, Brand, DeviceModel, DeviceSeries, DeviceType, Part, QuoteStatus,
};
use crate::customers::{self, CustomerInput};
use crate::dashboard::{self, DashboardTab};
use crate::errors::ShopError;
use crate::inventory::{self, StockAdjustment};
use crate::orders::{self, CheckoutRequest, OrderLookup, StatusUpdate};
use crate::quotes::{self, QuoteRequest, QuoteResponse};
use crate::repairs::{self, PartUsageRequest, RepairInput, RepairStatusUpdate};
use crate::wishlist::{self, WishlistAdd};
use crate::{cart, cart::AddToCart};

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct IdsBody {
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteStatusBody {
    status: QuoteStatus,
}

fn not_found(req: &Request) -> ShopError {
    ShopError::NotFound(format!("no route for {} {}", req.method, req.path))
}

/// Whether a path needs an admin token.
#[must_use]
pub fn is_admin_route(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["admin", ..] | ["devices", "reorder"] | ["parts", "reorder"] | ["search", "repairs"]
    )
}

fn catalog_query(req: &Request, include_inactive: bool) -> Result<CatalogQuery, ShopError> {
    let device_type = req
        .query_param("deviceType")
        .map(|raw| serde_json::from_value::<DeviceType>(Value::String(raw.to_string())))
        .transpose()?;
    Ok(CatalogQuery {
        brand_id: req.query_param("brandId").map(ToString::to_string),
        series_id: req.query_param("seriesId").map(ToString::to_string),
        device_type,
        search: req.query_param("search").map(ToString::to_string),
        include_inactive,
    })
}

/// Dispatch a parsed request.
///
/// # Errors
///
/// Any error from authentication, body parsing or the service operation.
pub async fn route(state: &AppState, req: &Request) -> Result<Value, ShopError> {
    let tenant = req.tenant(&state.config.default_tenant);
    let owned = req.segments();
    let segments: Vec<&str> = owned.iter().map(String::as_str).collect();

    if is_admin_route(&segments) {
        let token = auth::bearer_token(req.header("authorization"))
            .ok_or_else(|| ShopError::Unauthorized("missing bearer token".to_string()))?;
        let subject = auth::verify_admin_token(&state.config.admin_token_secret, token)?;
        info!(tenant, admin = %subject, method = %req.method, path = %req.path, "Admin request");
        return admin_route(state, tenant, req, &segments).await;
    }
    storefront_route(state, tenant, req, &segments).await
}

// ============================================================================
// Storefront
// ============================================================================

async fn storefront_route(
    state: &AppState,
    tenant: &str,
    req: &Request,
    segments: &[&str],
) -> Result<Value, ShopError> {
    match (req.method.as_str(), segments) {
        ("GET", ["health"]) => Ok(ok(&json!({ "ok": true }))),

        // Catalog
        ("GET", ["catalog"]) => {
            let query = catalog_query(req, false)?;
            Ok(ok(&catalog::browse(state, tenant, &query).await?))
        }
        ("GET", ["catalog", "search"]) => {
            let text = req.query_param("q").unwrap_or_default();
            Ok(ok(&catalog::search_models(state, tenant, text).await?))
        }

        // Inventory
        ("GET", ["parts"]) => match req.query_param("modelId") {
            Some(model_id) => Ok(ok(&inventory::parts_for_model(state, tenant, model_id).await?)),
            None => Ok(ok(&inventory::list_parts(state, tenant, false).await?)),
        },
        ("GET", ["parts", id]) => Ok(ok(&inventory::part_detail(state, tenant, id).await?)),
        ("GET", ["accessories"]) => {
            Ok(ok(&inventory::list_accessories(state, tenant, false).await?))
        }
        ("GET", ["accessories", id]) => {
            Ok(ok(&inventory::accessory_detail(state, tenant, id).await?))
        }

        // Cart
        ("GET", ["cart"]) => Ok(ok(&cart::summary(state, tenant, req.session_id()?).await?)),
        ("DELETE", ["cart"]) => {
            cart::clear(state, tenant, req.session_id()?).await?;
            Ok(no_content())
        }
        ("POST", ["cart", "items"]) => {
            let body: AddToCart = req.json()?;
            Ok(ok(&cart::add_item(state, tenant, req.session_id()?, &body).await?))
        }
        ("PUT", ["cart", "items", item_id]) => {
            let body: QuantityBody = req.json()?;
            Ok(ok(&cart::update_quantity(
                state,
                tenant,
                req.session_id()?,
                item_id,
                body.quantity,
            )
            .await?))
        }
        ("DELETE", ["cart", "items", item_id]) => Ok(ok(&cart::remove_item(
            state,
            tenant,
            req.session_id()?,
            item_id,
        )
        .await?)),

        // Orders
        ("POST", ["checkout"]) => {
            let body: CheckoutRequest = req.json()?;
            Ok(created(&orders::checkout(state, tenant, req.session_id()?, &body).await?))
        }
        ("POST", ["orders", "lookup"]) => {
            let body: OrderLookup = req.json()?;
            Ok(ok(&orders::lookup(state, tenant, &body).await?))
        }

        // Forms
        ("POST", ["quotes"]) => {
            let body: QuoteRequest = req.json()?;
            Ok(created(&quotes::submit(state, tenant, &body).await?))
        }
        ("POST", ["contact"]) => {
            let body: ContactRequest = req.json()?;
            Ok(created(&contact::submit(state, tenant, &body).await?))
        }

        // Wishlist
        ("GET", ["wishlist"]) => Ok(ok(&wishlist::list(state, tenant, req.session_id()?).await?)),
        ("POST", ["wishlist"]) => {
            let body: WishlistAdd = req.json()?;
            Ok(created(&wishlist::add(state, tenant, req.session_id()?, &body).await?))
        }
        ("GET", ["wishlist", "check", item_id]) => {
            let present = wishlist::contains(state, tenant, req.session_id()?, item_id).await?;
            Ok(ok(&json!({ "inWishlist": present })))
        }
        ("DELETE", ["wishlist", item_id]) => {
            wishlist::remove(state, tenant, req.session_id()?, item_id).await?;
            Ok(no_content())
        }

        // Cookie consent
        ("GET", ["consent"]) => Ok(ok(&consent::status(req.cookie_header()))),
        ("POST", ["consent"]) => {
            let prefs: ConsentPreferences = req.json()?;
            let (record, cookie) = consent::record(
                state,
                tenant,
                req.session_id()?,
                prefs,
                req.header("user-agent"),
            )
            .await?;
            let status = json!({
                "decided": true,
                "preferences": record.preferences,
                "allowedScripts": record.preferences.allowed_scripts(),
            });
            Ok(with_cookie(ok(&status), &cookie))
        }

        _ => Err(not_found(req)),
    }
}

// ============================================================================
// Admin
// ============================================================================

async fn admin_route(
    state: &AppState,
    tenant: &str,
    req: &Request,
    segments: &[&str],
) -> Result<Value, ShopError> {
    match (req.method.as_str(), segments) {
        // Routes kept at the top level for the dashboard's drag-and-drop lists.
        ("POST", ["devices", "reorder"]) => {
            let body: ReorderRequest = req.json()?;
            Ok(ok(&catalog::reorder(state, tenant, &body).await?))
        }
        ("POST", ["parts", "reorder"]) => {
            let body: IdsBody = req.json()?;
            Ok(ok(&inventory::reorder_parts(state, tenant, &body.ids).await?))
        }
        ("GET", ["search", "repairs"]) => {
            let text = req.query_param("q").unwrap_or_default();
            Ok(ok(&repairs::search(state, tenant, text).await?))
        }

        ("GET", ["admin", "dashboard"]) => {
            let tab = DashboardTab::from_param(req.query_param("tab"));
            Ok(ok(&dashboard::load_tab(state, tenant, tab).await?))
        }
        ("GET", ["admin", "dashboard", "snapshot"]) => {
            Ok(ok(&dashboard::snapshot(state, tenant).await?))
        }

        ("GET", ["admin", "catalog"]) => {
            let query = catalog_query(req, true)?;
            Ok(ok(&catalog::browse(state, tenant, &query).await?))
        }
        ("GET", ["admin", "catalog", "cache"]) => {
            let (hits, misses) = state.catalog_cache.stats();
            Ok(ok(&json!({ "hits": hits, "misses": misses })))
        }
        ("POST", ["admin", "brands"]) => {
            let body: Brand = req.json()?;
            Ok(created(&catalog::create_brand(state, tenant, body).await?))
        }
        ("PUT", ["admin", "brands", id]) => {
            let body: Brand = req.json()?;
            Ok(ok(&catalog::update_brand(state, tenant, id, body).await?))
        }
        ("DELETE", ["admin", "brands", id]) => {
            catalog::delete_brand(state, tenant, id).await?;
            Ok(no_content())
        }
        ("POST", ["admin", "series"]) => {
            let body: DeviceSeries = req.json()?;
            Ok(created(&catalog::create_series(state, tenant, body).await?))
        }
        ("PUT", ["admin", "series", id]) => {
            let body: DeviceSeries = req.json()?;
            Ok(ok(&catalog::update_series(state, tenant, id, body).await?))
        }
        ("DELETE", ["admin", "series", id]) => {
            catalog::delete_series(state, tenant, id).await?;
            Ok(no_content())
        }
        ("POST", ["admin", "models"]) => {
            let body: DeviceModel = req.json()?;
            Ok(created(&catalog::create_model(state, tenant, body).await?))
        }
        ("PUT", ["admin", "models", id]) => {
            let body: DeviceModel = req.json()?;
            Ok(ok(&catalog::update_model(state, tenant, id, body).await?))
        }
        ("DELETE", ["admin", "models", id]) => {
            catalog::delete_model(state, tenant, id).await?;
            Ok(no_content())
        }

        ("GET", ["admin", "parts"]) => Ok(ok(&inventory::list_parts(state, tenant, true).await?)),
        ("GET", ["admin", "parts", "low-stock"]) => {
            Ok(ok(&inventory::low_stock_parts(state, tenant).await?))
        }
        ("POST", ["admin", "parts"]) => {
            let body: Part = req.json()?;
            Ok(created(&inventory::create_part(state, tenant, body).await?))
        }
        ("PUT", ["admin", "parts", id]) => {
            let body: Part = req.json()?;
            Ok(ok(&inventory::update_part(state, tenant, id, body).await?))
        }
        ("DELETE", ["admin", "parts", id]) => {
            inventory::delete_part(state, tenant, id).await?;
            Ok(no_content())
        }
        ("POST", ["admin", "parts", id, "stock"]) => {
            let body: StockAdjustment = req.json()?;
            Ok(ok(&inventory::adjust_part_stock(state, tenant, id, &body).await?))
        }

        ("GET", ["admin", "accessories"]) => {
            Ok(ok(&inventory::list_accessories(state, tenant, true).await?))
        }
        ("POST", ["admin", "accessories"]) => {
            let body: Accessory = req.json()?;
            Ok(created(&inventory::create_accessory(state, tenant, body).await?))
        }
        ("POST", ["admin", "accessories", "reorder"]) => {
            let body: IdsBody = req.json()?;
            Ok(ok(&inventory::reorder_accessories(state, tenant, &body.ids).await?))
        }
        ("PUT", ["admin", "accessories", id]) => {
            let body: Accessory = req.json()?;
            Ok(ok(&inventory::update_accessory(state, tenant, id, body).await?))
        }
        ("DELETE", ["admin", "accessories", id]) => {
            inventory::delete_accessory(state, tenant, id).await?;
            Ok(no_content())
        }
        ("POST", ["admin", "accessories", id, "stock"]) => {
            let body: StockAdjustment = req.json()?;
            Ok(ok(&inventory::adjust_accessory_stock(state, tenant, id, &body).await?))
        }

        ("GET", ["admin", "customers"]) => Ok(ok(&customers::list(state, tenant).await?)),
        ("POST", ["admin", "customers"]) => {
            let body: CustomerInput = req.json()?;
            Ok(created(&customers::create(state, tenant, &body).await?))
        }
        ("GET", ["admin", "customers", id]) => Ok(ok(&customers::get(state, tenant, id).await?)),
        ("PUT", ["admin", "customers", id]) => {
            let body: CustomerInput = req.json()?;
            Ok(ok(&customers::update(state, tenant, id, &body).await?))
        }
        ("DELETE", ["admin", "customers", id]) => {
            customers::delete(state, tenant, id).await?;
            Ok(no_content())
        }
        ("GET", ["admin", "customers", id, "repairs"]) => {
            Ok(ok(&customers::history(state, tenant, id).await?))
        }

        ("GET", ["admin", "repairs"]) => Ok(ok(&repairs::list(state, tenant).await?)),
        ("POST", ["admin", "repairs"]) => {
            let body: RepairInput = req.json()?;
            Ok(created(&repairs::create(state, tenant, &body).await?))
        }
        ("GET", ["admin", "repairs", id]) => Ok(ok(&repairs::get(state, tenant, id).await?)),
        ("PUT", ["admin", "repairs", id]) => {
            let body: RepairInput = req.json()?;
            Ok(ok(&repairs::update(state, tenant, id, &body).await?))
        }
        ("DELETE", ["admin", "repairs", id]) => {
            repairs::delete(state, tenant, id).await?;
            Ok(no_content())
        }
        ("PUT", ["admin", "repairs", id, "status"]) => {
            let body: RepairStatusUpdate = req.json()?;
            Ok(ok(&repairs::update_status(state, tenant, id, &body).await?))
        }
        ("POST", ["admin", "repairs", id, "parts"]) => {
            let body: PartUsageRequest = req.json()?;
            Ok(ok(&repairs::record_part_usage(state, tenant, id, &body).await?))
        }

        ("GET", ["admin", "quotes"]) => Ok(ok(&quotes::list(state, tenant).await?)),
        ("GET", ["admin", "quotes", id]) => Ok(ok(&quotes::get(state, tenant, id).await?)),
        ("DELETE", ["admin", "quotes", id]) => {
            quotes::delete(state, tenant, id).await?;
            Ok(no_content())
        }
        ("POST", ["admin", "quotes", id, "respond"]) => {
            let body: QuoteResponse = req.json()?;
            Ok(ok(&quotes::respond(state, tenant, id, &body).await?))
        }
        ("PUT", ["admin", "quotes", id, "status"]) => {
            let body: QuoteStatusBody = req.json()?;
            Ok(ok(&quotes::set_status(state, tenant, id, body.status).await?))
        }
        ("POST", ["admin", "quotes", id, "convert"]) => {
            let (quote, repair) = quotes::convert_to_repair(state, tenant, id).await?;
            Ok(created(&json!({ "quote": quote, "repair": repair })))
        }

        ("GET", ["admin", "orders"]) => Ok(ok(&orders::list(state, tenant).await?)),
        ("GET", ["admin", "orders", id]) => Ok(ok(&orders::get(state, tenant, id).await?)),
        ("PUT", ["admin", "orders", id, "status"]) => {
            let body: StatusUpdate = req.json()?;
            Ok(ok(&orders::update_status(state, tenant, id, &body).await?))
        }

        ("GET", ["admin", "contact"]) => Ok(ok(&contact::list(state, tenant).await?)),
        ("POST", ["admin", "contact", id, "reply"]) => {
            let body: ContactReply = req.json()?;
            Ok(ok(&contact::reply(state, tenant, id, &body).await?))
        }

        _ => Err(not_found(req)),
    }
}
