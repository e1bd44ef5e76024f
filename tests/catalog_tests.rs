mod common;

use std::sync::Arc;

use common::{TENANT, instance, state};
use repairshop::app::AppState;
use repairshop::catalog::{
    self, CatalogItems, CatalogLevel, CatalogQuery, ReorderRequest,
};
use repairshop::core::models::{Brand, DeviceModel, DeviceSeries, DeviceType};
use repairshop::errors::ShopError;
use repairshop::store::{KvStore, MemoryStore};

async fn brand(state: &AppState, name: &str) -> Brand {
    catalog::create_brand(
        state,
        TENANT,
        Brand {
            id: String::new(),
            name: name.into(),
            slug: String::new(),
            logo_url: None,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap()
}

async fn series(state: &AppState, brand_id: &str, name: &str, device_type: DeviceType) -> DeviceSeries {
    catalog::create_series(
        state,
        TENANT,
        DeviceSeries {
            id: String::new(),
            brand_id: brand_id.into(),
            name: name.into(),
            slug: String::new(),
            device_type,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap()
}

async fn model(state: &AppState, series: &DeviceSeries, name: &str) -> DeviceModel {
    catalog::create_model(
        state,
        TENANT,
        DeviceModel {
            id: String::new(),
            brand_id: series.brand_id.clone(),
            series_id: series.id.clone(),
            name: name.into(),
            slug: String::new(),
            release_year: Some(2022),
            image_url: None,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap()
}

fn brand_names(items: &CatalogItems) -> Vec<String> {
    match items {
        CatalogItems::Brands(b) => b.iter().map(|b| b.name.clone()).collect(),
        other => panic!("expected brands, got {other:?}"),
    }
}

#[tokio::test]
async fn test_drill_down_with_breadcrumb() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let iphone = series(&state, &apple.id, "iPhone", DeviceType::Phone).await;
    let ipad = series(&state, &apple.id, "iPad", DeviceType::Tablet).await;
    model(&state, &iphone, "iPhone 13").await;
    model(&state, &iphone, "iPhone 14").await;
    model(&state, &ipad, "iPad Air").await;

    let root = catalog::browse(&state, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(root.level, CatalogLevel::Brands);
    assert!(root.breadcrumb.is_empty());
    assert_eq!(brand_names(&root.items), vec!["Apple"]);

    let level = catalog::browse(
        &state,
        TENANT,
        &CatalogQuery {
            brand_id: Some(apple.id.clone()),
            device_type: Some(DeviceType::Tablet),
            ..CatalogQuery::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(level.level, CatalogLevel::Series);
    assert_eq!(level.items.len(), 1);

    let models = catalog::browse(
        &state,
        TENANT,
        &CatalogQuery {
            series_id: Some(iphone.id.clone()),
            search: Some("14".into()),
            ..CatalogQuery::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(models.level, CatalogLevel::Models);
    assert_eq!(models.breadcrumb.len(), 2);
    assert_eq!(models.breadcrumb[0].name, "Apple");
    assert_eq!(models.breadcrumb[1].name, "iPhone");
    match models.items {
        CatalogItems::Models(m) => {
            assert_eq!(m.len(), 1);
            assert_eq!(m[0].slug, "iphone-14");
        }
        other => panic!("expected models, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_is_invalidated_by_mutations() {
    let (state, _) = state();
    brand(&state, "Samsung").await;

    let first = catalog::browse(&state, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(first.items.len(), 1);
    // Served from cache the second time.
    catalog::browse(&state, TENANT, &CatalogQuery::default()).await.unwrap();
    let (hits, _) = state.catalog_cache.stats();
    assert!(hits >= 1);

    brand(&state, "Google").await;
    let after = catalog::browse(&state, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&after.items), vec!["Samsung", "Google"]);
}

#[tokio::test]
async fn test_reorder_rewrites_order_and_rejects_partial_sets() {
    let (state, _) = state();
    let a = brand(&state, "Apple").await;
    let b = brand(&state, "Google").await;
    let c = brand(&state, "Samsung").await;

    let err = catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Brands,
            parent_id: None,
            ids: vec![c.id.clone(), a.id.clone()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let err = catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Brands,
            parent_id: None,
            ids: vec![c.id.clone(), a.id.clone(), "foreign".into()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Brands,
            parent_id: None,
            ids: vec![c.id.clone(), a.id.clone(), b.id.clone()],
        },
    )
    .await
    .unwrap();

    let view = catalog::browse(&state, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&view.items), vec!["Samsung", "Apple", "Google"]);
    let stored = state.brands(TENANT).list().await.unwrap();
    let mut orders: Vec<u32> = stored.iter().map(|b| b.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_series_reorder_needs_parent() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let s = series(&state, &apple.id, "iPhone", DeviceType::Phone).await;

    let err = catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Series,
            parent_id: None,
            ids: vec![s.id.clone()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn test_parents_with_children_cannot_be_deleted() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let s = series(&state, &apple.id, "Watch", DeviceType::Watch).await;
    let m = model(&state, &s, "Watch Series 8").await;

    assert!(matches!(
        catalog::delete_brand(&state, TENANT, &apple.id).await,
        Err(ShopError::Conflict(_))
    ));
    assert!(matches!(
        catalog::delete_series(&state, TENANT, &s.id).await,
        Err(ShopError::Conflict(_))
    ));

    catalog::delete_model(&state, TENANT, &m.id).await.unwrap();
    catalog::delete_series(&state, TENANT, &s.id).await.unwrap();
    catalog::delete_brand(&state, TENANT, &apple.id).await.unwrap();
}

#[tokio::test]
async fn test_model_must_match_series_brand() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let samsung = brand(&state, "Samsung").await;
    let galaxy = series(&state, &samsung.id, "Galaxy S", DeviceType::Phone).await;

    let err = catalog::create_model(
        &state,
        TENANT,
        DeviceModel {
            id: String::new(),
            brand_id: apple.id.clone(),
            series_id: galaxy.id.clone(),
            name: "Confused".into(),
            slug: String::new(),
            release_year: None,
            image_url: None,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn test_search_models_across_brands() {
    let (state, _) = state();
    let samsung = brand(&state, "Samsung").await;
    let galaxy = series(&state, &samsung.id, "Galaxy S", DeviceType::Phone).await;
    model(&state, &galaxy, "Galaxy S22").await;
    model(&state, &galaxy, "Galaxy S23").await;

    let hits = catalog::search_models(&state, TENANT, "samsung s23").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].brand_name, "Samsung");
    assert_eq!(hits[0].model.name, "Galaxy S23");

    assert!(catalog::search_models(&state, TENANT, "  ").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_follows_changes_made_by_other_instances() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let writer = instance(Arc::clone(&store));
    let reader = instance(store);
    let apple = brand(&writer, "Apple").await;

    let view = catalog::browse(&reader, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&view.items), vec!["Apple"]);
    catalog::browse(&reader, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(reader.catalog_cache.stats().0, 1);

    let google = brand(&writer, "Google").await;
    let view = catalog::browse(&reader, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&view.items), vec!["Apple", "Google"]);

    catalog::reorder(
        &writer,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Brands,
            parent_id: None,
            ids: vec![google.id.clone(), apple.id.clone()],
        },
    )
    .await
    .unwrap();
    let view = catalog::browse(&reader, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&view.items), vec!["Google", "Apple"]);

    catalog::delete_brand(&writer, TENANT, &google.id).await.unwrap();
    let view = catalog::browse(&reader, TENANT, &CatalogQuery::default()).await.unwrap();
    assert_eq!(brand_names(&view.items), vec!["Apple"]);
}

#[tokio::test]
async fn test_cached_levels_drop_after_reorder_and_delete() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let iphone = series(&state, &apple.id, "iPhone", DeviceType::Phone).await;
    let m13 = model(&state, &iphone, "iPhone 13").await;
    let m14 = model(&state, &iphone, "iPhone 14").await;
    let m15 = model(&state, &iphone, "iPhone 15").await;
    let query = CatalogQuery {
        series_id: Some(iphone.id.clone()),
        ..CatalogQuery::default()
    };
    let names = |view: &catalog::CatalogView| match &view.items {
        CatalogItems::Models(m) => m.iter().map(|m| m.name.clone()).collect::<Vec<_>>(),
        other => panic!("expected models, got {other:?}"),
    };

    let view = catalog::browse(&state, TENANT, &query).await.unwrap();
    assert_eq!(names(&view), vec!["iPhone 13", "iPhone 14", "iPhone 15"]);

    let reordered = catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Models,
            parent_id: Some(iphone.id.clone()),
            ids: vec![m15.id.clone(), m14.id.clone(), m13.id.clone()],
        },
    )
    .await
    .unwrap();
    assert_eq!(reordered.len(), 3);
    let view = catalog::browse(&state, TENANT, &query).await.unwrap();
    assert_eq!(names(&view), vec!["iPhone 15", "iPhone 14", "iPhone 13"]);

    catalog::delete_model(&state, TENANT, &m14.id).await.unwrap();
    let view = catalog::browse(&state, TENANT, &query).await.unwrap();
    assert_eq!(names(&view), vec!["iPhone 15", "iPhone 13"]);
}

#[tokio::test]
async fn test_model_reorder_rejects_models_of_other_series() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let iphone = series(&state, &apple.id, "iPhone", DeviceType::Phone).await;
    let ipad = series(&state, &apple.id, "iPad", DeviceType::Tablet).await;
    let phone = model(&state, &iphone, "iPhone 13").await;
    let tablet = model(&state, &ipad, "iPad Air").await;

    let err = catalog::reorder(
        &state,
        TENANT,
        &ReorderRequest {
            level: CatalogLevel::Models,
            parent_id: Some(iphone.id.clone()),
            ids: vec![tablet.id.clone(), phone.id.clone()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn test_slugs_stay_unique_among_siblings() {
    let (state, _) = state();
    let apple = brand(&state, "Apple").await;
    let google = brand(&state, "Google").await;

    let mut renamed = google.clone();
    renamed.slug = "Apple".into();
    let err = catalog::update_brand(&state, TENANT, &google.id, renamed)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
    // Keeping its own slug is fine.
    catalog::update_brand(&state, TENANT, &apple.id, apple.clone())
        .await
        .unwrap();

    let iphone = series(&state, &apple.id, "iPhone", DeviceType::Phone).await;
    let err = catalog::create_series(
        &state,
        TENANT,
        DeviceSeries {
            id: String::new(),
            brand_id: apple.id.clone(),
            name: "iPhone".into(),
            slug: String::new(),
            device_type: DeviceType::Phone,
            order: 0,
            active: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
    // Same slug under another brand is allowed.
    series(&state, &google.id, "iPhone", DeviceType::Phone).await;

    model(&state, &iphone, "iPhone 13").await;
    let m14 = model(&state, &iphone, "iPhone 14").await;
    let mut clash = m14.clone();
    clash.slug = "iphone-13".into();
    let err = catalog::update_model(&state, TENANT, &m14.id, clash)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
}
