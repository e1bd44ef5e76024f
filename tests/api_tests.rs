mod common;

use common::{ADMIN_EMAIL, SECRET, SESSION, TENANT, seed_accessory, seed_customer, state};
use repairshop::api::auth::{issue_admin_token, verify_admin_token_at};
use repairshop::api::handle_event;
use repairshop::catalog;
use repairshop::core::models::{Brand, DeviceModel, DeviceSeries, DeviceType};
use repairshop::repairs::{self, RepairInput};
use repairshop::errors::ShopError;
use serde_json::{Value, json};

fn event(method: &str, path: &str, headers: Value, body: Option<Value>) -> Value {
    let mut event = json!({
        "version": "2.0",
        "rawPath": path,
        "rawQueryString": "",
        "headers": headers,
        "requestContext": { "http": { "method": method, "path": path } },
    });
    if let Some(body) = body {
        event["body"] = Value::String(body.to_string());
    }
    event
}

fn storefront(method: &str, path: &str, body: Option<Value>) -> Value {
    event(
        method,
        path,
        json!({ "x-tenant-id": TENANT, "x-session-id": SESSION }),
        body,
    )
}

fn admin(method: &str, path: &str, token: &str) -> Value {
    event(
        method,
        path,
        json!({ "x-tenant-id": TENANT, "authorization": format!("Bearer {token}") }),
        None,
    )
}

fn body(response: &Value) -> Value {
    serde_json::from_str(response["body"].as_str().unwrap_or("null")).unwrap()
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let (state, _) = state();
    let resp = handle_event(&state, storefront("GET", "/api/health", None)).await;
    assert_eq!(resp["statusCode"], 200);
    assert_eq!(body(&resp)["ok"], true);
    assert_eq!(resp["headers"]["Content-Type"], "application/json");

    let resp = handle_event(&state, storefront("GET", "/api/nowhere", None)).await;
    assert_eq!(resp["statusCode"], 404);
    assert!(body(&resp)["error"].as_str().unwrap().contains("/api/nowhere"));
}

#[tokio::test]
async fn test_malformed_event_is_bad_request() {
    let (state, _) = state();
    let resp = handle_event(&state, json!({ "rawPath": "/api/health" })).await;
    assert_eq!(resp["statusCode"], 400);
}

#[tokio::test]
async fn test_admin_routes_require_valid_token() {
    let (state, _) = state();

    let resp = handle_event(
        &state,
        event("GET", "/api/admin/dashboard", json!({ "x-tenant-id": TENANT }), None),
    )
    .await;
    assert_eq!(resp["statusCode"], 401);

    let token = issue_admin_token(SECRET, ADMIN_EMAIL, 3600);
    let resp = handle_event(&state, admin("GET", "/api/admin/dashboard", &token)).await;
    assert_eq!(resp["statusCode"], 200);
    assert_eq!(body(&resp)["tab"], "overview");

    let forged = issue_admin_token("some-other-secret", ADMIN_EMAIL, 3600);
    let resp = handle_event(&state, admin("GET", "/api/admin/dashboard", &forged)).await;
    assert_eq!(resp["statusCode"], 401);

    let tampered = token.replacen(ADMIN_EMAIL, "intruder@shop.test", 1);
    let resp = handle_event(&state, admin("GET", "/api/search/repairs", &tampered)).await;
    assert_eq!(resp["statusCode"], 401);
}

#[test]
fn test_expired_token_is_rejected() {
    let token = issue_admin_token(SECRET, ADMIN_EMAIL, 60);
    let expires: u64 = token.rsplitn(3, '.').nth(1).unwrap().parse().unwrap();

    assert_eq!(
        verify_admin_token_at(SECRET, &token, expires - 1).unwrap(),
        ADMIN_EMAIL
    );
    match verify_admin_token_at(SECRET, &token, expires) {
        Err(ShopError::Unauthorized(msg)) => assert_eq!(msg, "admin token expired"),
        other => panic!("expected expiry error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cart_requires_session() {
    let (state, _) = state();
    let resp = handle_event(
        &state,
        event("GET", "/api/cart", json!({ "x-tenant-id": TENANT }), None),
    )
    .await;
    assert_eq!(resp["statusCode"], 400);
    assert!(body(&resp)["error"].as_str().unwrap().contains("session"));
}

#[tokio::test]
async fn test_session_from_v2_cookie_array() {
    let (state, _) = state();
    let mut ev = event("GET", "/api/cart", json!({ "x-tenant-id": TENANT }), None);
    ev["cookies"] = json!(["theme=dark", format!("session_id={SESSION}")]);
    let resp = handle_event(&state, ev).await;
    assert_eq!(resp["statusCode"], 200);
}

#[tokio::test]
async fn test_wishlist_over_http() {
    let (state, _) = state();
    let case = seed_accessory(&state, "Leather Case", 4).await;

    let resp = handle_event(
        &state,
        storefront(
            "POST",
            "/api/wishlist",
            Some(json!({ "kind": "Accessory", "itemId": case.id })),
        ),
    )
    .await;
    assert_eq!(resp["statusCode"], 201);

    let check = format!("/api/wishlist/check/{}", case.id);
    let resp = handle_event(&state, storefront("GET", &check, None)).await;
    assert_eq!(body(&resp)["inWishlist"], true);

    let resp = handle_event(&state, storefront("GET", "/api/wishlist", None)).await;
    let items = body(&resp);
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["name"], "Leather Case");

    let delete = format!("/api/wishlist/{}", case.id);
    let resp = handle_event(&state, storefront("DELETE", &delete, None)).await;
    assert_eq!(resp["statusCode"], 204);
    let resp = handle_event(&state, storefront("GET", &check, None)).await;
    assert_eq!(body(&resp)["inWishlist"], false);
}

#[tokio::test]
async fn test_consent_post_sets_cookie() {
    let (state, _) = state();
    let resp = handle_event(
        &state,
        storefront(
            "POST",
            "/api/consent",
            Some(json!({ "functional": true, "marketing": true })),
        ),
    )
    .await;
    assert_eq!(resp["statusCode"], 200);
    let cookie = resp["headers"]["Set-Cookie"].as_str().unwrap();
    assert!(cookie.starts_with("cookie_consent="));

    let status = body(&resp);
    assert_eq!(status["decided"], true);
    assert_eq!(
        status["allowedScripts"],
        json!(["necessary", "functional", "marketing"])
    );

    let pair = cookie.split(';').next().unwrap();
    let resp = handle_event(
        &state,
        event(
            "GET",
            "/api/consent",
            json!({ "x-tenant-id": TENANT, "cookie": pair }),
            None,
        ),
    )
    .await;
    assert_eq!(body(&resp)["decided"], true);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let (state, _) = state();
    seed_accessory(&state, "Shop A Case", 4).await;

    let resp = handle_event(&state, storefront("GET", "/api/accessories", None)).await;
    assert_eq!(body(&resp).as_array().unwrap().len(), 1);

    let resp = handle_event(
        &state,
        event(
            "GET",
            "/api/accessories",
            json!({ "x-tenant-id": "shop-b" }),
            None,
        ),
    )
    .await;
    assert_eq!(resp["statusCode"], 200);
    assert!(body(&resp).as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let (state, _) = state();
    let mut ev = storefront("POST", "/api/contact", None);
    ev["body"] = Value::String("{not json".to_string());
    let resp = handle_event(&state, ev).await;
    assert_eq!(resp["statusCode"], 400);
}

#[tokio::test]
async fn test_admin_stock_adjustment_over_http() {
    let (state, _) = state();
    let case = seed_accessory(&state, "Leather Case", 5).await;
    let token = issue_admin_token(SECRET, ADMIN_EMAIL, 3600);
    let path = format!("/api/admin/accessories/{}/stock", case.id);
    let auth = json!({ "x-tenant-id": TENANT, "authorization": format!("Bearer {token}") });

    let resp = handle_event(
        &state,
        event("POST", &path, auth.clone(), Some(json!({ "delta": -2, "reason": "damaged" }))),
    )
    .await;
    assert_eq!(resp["statusCode"], 200);
    assert_eq!(body(&resp)["inStock"], 3);

    let resp = handle_event(&state, event("POST", &path, auth, Some(json!({ "delta": -4 })))).await;
    assert_eq!(resp["statusCode"], 400);
    assert_eq!(
        state.accessories(TENANT).get_or_err(&case.id).await.unwrap().in_stock,
        3
    );

    let resp = handle_event(
        &state,
        event(
            "POST",
            &path,
            json!({ "x-tenant-id": TENANT }),
            Some(json!({ "delta": 10 })),
        ),
    )
    .await;
    assert_eq!(resp["statusCode"], 401);
}

#[tokio::test]
async fn test_search_routes() {
    let (state, _) = state();
    let samsung = catalog::create_brand(
        &state,
        TENANT,
        Brand {
            id: String::new(),
            name: "Samsung".into(),
            slug: String::new(),
            logo_url: None,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap();
    let galaxy = catalog::create_series(
        &state,
        TENANT,
        DeviceSeries {
            id: String::new(),
            brand_id: samsung.id.clone(),
            name: "Galaxy S".into(),
            slug: String::new(),
            device_type: DeviceType::Phone,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap();
    catalog::create_model(
        &state,
        TENANT,
        DeviceModel {
            id: String::new(),
            brand_id: samsung.id.clone(),
            series_id: galaxy.id.clone(),
            name: "Galaxy S23".into(),
            slug: String::new(),
            release_year: Some(2023),
            image_url: None,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap();

    let mut ev = storefront("GET", "/api/catalog/search", None);
    ev["rawQueryString"] = json!("q=samsung+s23");
    let resp = handle_event(&state, ev).await;
    assert_eq!(resp["statusCode"], 200);
    let hits = body(&resp);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["brandName"], "Samsung");

    let jane = seed_customer(&state, "Jane", "Doe", "jane@example.com").await;
    repairs::create(
        &state,
        TENANT,
        &RepairInput {
            customer_id: jane.id.clone(),
            device_model_id: None,
            device_label: "Galaxy S23".into(),
            issue: "Cracked back glass".into(),
            estimated_cost_cents: None,
            technician_notes: None,
        },
    )
    .await
    .unwrap();
    let token = issue_admin_token(SECRET, ADMIN_EMAIL, 3600);
    let mut ev = admin("GET", "/api/search/repairs", &token);
    ev["rawQueryString"] = json!("q=jane");
    let resp = handle_event(&state, ev).await;
    assert_eq!(resp["statusCode"], 200);
    let hits = body(&resp);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["customerName"], "Jane Doe");
}
