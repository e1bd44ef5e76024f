//! Device catalog: brands → series → models drill-down, search, admin CRUD
//! and manual reordering.

pub mod cache;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::core::models::{Brand, DeviceModel, DeviceSeries, DeviceType};
use crate::core::validate::{FieldErrors, slugify};
use crate::errors::ShopError;
use crate::ordering::{apply_order, next_order, sort_ordered};
use crate::store::new_id;

pub use cache::{CatalogCache, CatalogStamp};

/// Maximum number of hits returned by [`search_models`].
pub const MAX_SEARCH_RESULTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogLevel {
    Brands,
    Series,
    Models,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogItems {
    Brands(Vec<Brand>),
    Series(Vec<DeviceSeries>),
    Models(Vec<DeviceModel>),
}

impl CatalogItems {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            CatalogItems::Brands(v) => v.len(),
            CatalogItems::Series(v) => v.len(),
            CatalogItems::Models(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drill-down position and filters, as sent by the catalog browser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    pub brand_id: Option<String>,
    pub series_id: Option<String>,
    pub device_type: Option<DeviceType>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Crumb {
    pub level: CatalogLevel,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub level: CatalogLevel,
    pub breadcrumb: Vec<Crumb>,
    pub items: CatalogItems,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHit {
    pub model: DeviceModel,
    pub brand_name: String,
    pub series_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub level: CatalogLevel,
    pub parent_id: Option<String>,
    pub ids: Vec<String>,
}

fn matches_text(needle: &str, name: &str, slug: &str) -> bool {
    needle.is_empty()
        || name.to_lowercase().contains(needle)
        || slug.to_lowercase().contains(needle)
}

// ============================================================================
// Cached level loading
// ============================================================================

async fn catalog_stamp(state: &AppState, tenant: &str) -> Result<String, ShopError> {
    let stamp = state.repo::<CatalogStamp>(tenant).get(CatalogStamp::KEY).await?;
    Ok(stamp.map(|s| s.stamp).unwrap_or_default())
}

/// Record a catalog change so every instance drops its cached levels.
async fn catalog_changed(state: &AppState, tenant: &str) -> Result<(), ShopError> {
    state
        .repo::<CatalogStamp>(tenant)
        .save(CatalogStamp {
            stamp: new_id(),
            updated_at: Utc::now(),
        })
        .await?;
    state.catalog_cache.invalidate(tenant).await;
    Ok(())
}

async fn load_brands(
    state: &AppState,
    tenant: &str,
    stamp: &str,
) -> Result<Vec<Brand>, ShopError> {
    let cached = state.catalog_cache.get(tenant, stamp, "brands").await;
    if let Some(CatalogItems::Brands(v)) = cached {
        return Ok(v);
    }
    let mut brands = state.brands(tenant).list().await?;
    sort_ordered(&mut brands);
    state
        .catalog_cache
        .put(tenant, stamp, "brands", CatalogItems::Brands(brands.clone()))
        .await;
    Ok(brands)
}

async fn load_series(
    state: &AppState,
    tenant: &str,
    stamp: &str,
    brand_id: &str,
) -> Result<Vec<DeviceSeries>, ShopError> {
    let key = format!("series:{brand_id}");
    if let Some(CatalogItems::Series(v)) = state.catalog_cache.get(tenant, stamp, &key).await {
        return Ok(v);
    }
    let mut series = series_of(state, tenant, brand_id).await?;
    sort_ordered(&mut series);
    state
        .catalog_cache
        .put(tenant, stamp, &key, CatalogItems::Series(series.clone()))
        .await;
    Ok(series)
}

async fn load_models(
    state: &AppState,
    tenant: &str,
    stamp: &str,
    series_id: &str,
) -> Result<Vec<DeviceModel>, ShopError> {
    let key = format!("models:{series_id}");
    if let Some(CatalogItems::Models(v)) = state.catalog_cache.get(tenant, stamp, &key).await {
        return Ok(v);
    }
    let mut models = models_of(state, tenant, series_id).await?;
    sort_ordered(&mut models);
    state
        .catalog_cache
        .put(tenant, stamp, &key, CatalogItems::Models(models.clone()))
        .await;
    Ok(models)
}

async fn series_of(
    state: &AppState,
    tenant: &str,
    brand_id: &str,
) -> Result<Vec<DeviceSeries>, ShopError> {
    Ok(state
        .series(tenant)
        .list()
        .await?
        .into_iter()
        .filter(|s| s.brand_id == brand_id)
        .collect())
}

async fn models_of(
    state: &AppState,
    tenant: &str,
    series_id: &str,
) -> Result<Vec<DeviceModel>, ShopError> {
    Ok(state
        .models(tenant)
        .list()
        .await?
        .into_iter()
        .filter(|m| m.series_id == series_id)
        .collect())
}

// ============================================================================
// Browsing
// ============================================================================

/// One drill-down step: brands, the series of a brand, or the models of a series.
pub async fn browse(
    state: &AppState,
    tenant: &str,
    query: &CatalogQuery,
) -> Result<CatalogView, ShopError> {
    let needle = query
        .search
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let visible = |active: bool| active || query.include_inactive;
    let stamp = catalog_stamp(state, tenant).await?;

    if let Some(series_id) = &query.series_id {
        let series = state.series(tenant).get_or_err(series_id).await?;
        let brand = state.brands(tenant).get_or_err(&series.brand_id).await?;
        let type_ok = query.device_type.is_none_or(|t| t == series.device_type);
        let models = load_models(state, tenant, &stamp, series_id)
            .await?
            .into_iter()
            .filter(|m| type_ok && visible(m.active) && matches_text(&needle, &m.name, &m.slug))
            .collect();
        return Ok(CatalogView {
            level: CatalogLevel::Models,
            breadcrumb: vec![
                Crumb {
                    level: CatalogLevel::Brands,
                    id: brand.id,
                    name: brand.name,
                },
                Crumb {
                    level: CatalogLevel::Series,
                    id: series.id,
                    name: series.name,
                },
            ],
            items: CatalogItems::Models(models),
        });
    }

    if let Some(brand_id) = &query.brand_id {
        let brand = state.brands(tenant).get_or_err(brand_id).await?;
        let series = load_series(state, tenant, &stamp, brand_id)
            .await?
            .into_iter()
            .filter(|s| {
                visible(s.active)
                    && query.device_type.is_none_or(|t| t == s.device_type)
                    && matches_text(&needle, &s.name, &s.slug)
            })
            .collect();
        return Ok(CatalogView {
            level: CatalogLevel::Series,
            breadcrumb: vec![Crumb {
                level: CatalogLevel::Brands,
                id: brand.id,
                name: brand.name,
            }],
            items: CatalogItems::Series(series),
        });
    }

    let mut brands: Vec<Brand> = load_brands(state, tenant, &stamp)
        .await?
        .into_iter()
        .filter(|b| visible(b.active) && matches_text(&needle, &b.name, &b.slug))
        .collect();

    if let Some(device_type) = query.device_type {
        let all_series = state.series(tenant).list().await?;
        brands.retain(|b| {
            all_series
                .iter()
                .any(|s| s.brand_id == b.id && s.device_type == device_type && visible(s.active))
        });
    }

    Ok(CatalogView {
        level: CatalogLevel::Brands,
        breadcrumb: Vec::new(),
        items: CatalogItems::Brands(brands),
    })
}

/// Free-text model search across every brand, e.g. "galaxy s2" or "apple 15".
pub async fn search_models(
    state: &AppState,
    tenant: &str,
    text: &str,
) -> Result<Vec<ModelHit>, ShopError> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let (brand_repo, series_repo, model_repo) =
        (state.brands(tenant), state.series(tenant), state.models(tenant));
    let (brands, series, mut models) =
        futures::try_join!(brand_repo.list(), series_repo.list(), model_repo.list())?;
    sort_ordered(&mut models);

    let mut hits = Vec::new();
    for model in models.into_iter().filter(|m| m.active) {
        let brand_name = brands
            .iter()
            .find(|b| b.id == model.brand_id)
            .map(|b| b.name.clone())
            .unwrap_or_default();
        let series_name = series
            .iter()
            .find(|s| s.id == model.series_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let haystack = format!("{} {} {}", brand_name, series_name, model.name).to_lowercase();
        let all_terms = needle.split_whitespace().all(|term| haystack.contains(term));
        if all_terms || model.slug.contains(&needle) {
            hits.push(ModelHit {
                model,
                brand_name,
                series_name,
            });
            if hits.len() >= MAX_SEARCH_RESULTS {
                break;
            }
        }
    }
    Ok(hits)
}

// ============================================================================
// Admin CRUD
// ============================================================================

fn check_name(name: &str) -> Result<(), ShopError> {
    let mut errors = FieldErrors::new();
    errors.require("name", name);
    errors.into_result()
}

fn ensure_slug(slug: &mut String, name: &str) {
    if slug.trim().is_empty() {
        *slug = slugify(name);
    } else {
        *slug = slugify(slug);
    }
}

/// Slugs are unique among siblings. `own_id` is skipped so an update may keep its slug.
fn check_slug_free<'a>(
    kind: &str,
    slug: &str,
    own_id: &str,
    siblings: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), ShopError> {
    if siblings
        .into_iter()
        .any(|(id, taken)| id != own_id && taken == slug)
    {
        return Err(ShopError::Conflict(format!(
            "{kind} with slug '{slug}' already exists"
        )));
    }
    Ok(())
}

pub async fn create_brand(
    state: &AppState,
    tenant: &str,
    mut brand: Brand,
) -> Result<Brand, ShopError> {
    check_name(&brand.name)?;
    ensure_slug(&mut brand.slug, &brand.name);
    let existing = state.brands(tenant).list().await?;
    check_slug_free(
        "brand",
        &brand.slug,
        "",
        existing.iter().map(|b| (b.id.as_str(), b.slug.as_str())),
    )?;
    brand.id = new_id();
    brand.order = next_order(&existing);
    let brand = state.brands(tenant).insert(brand).await?;
    catalog_changed(state, tenant).await?;
    info!(tenant, brand_id = %brand.id, "Brand created");
    Ok(brand)
}

pub async fn update_brand(
    state: &AppState,
    tenant: &str,
    id: &str,
    mut brand: Brand,
) -> Result<Brand, ShopError> {
    check_name(&brand.name)?;
    let current = state.brands(tenant).get_or_err(id).await?;
    ensure_slug(&mut brand.slug, &brand.name);
    let existing = state.brands(tenant).list().await?;
    check_slug_free(
        "brand",
        &brand.slug,
        &current.id,
        existing.iter().map(|b| (b.id.as_str(), b.slug.as_str())),
    )?;
    brand.id = current.id;
    brand.order = current.order;
    let brand = state.brands(tenant).save(brand).await?;
    catalog_changed(state, tenant).await?;
    Ok(brand)
}

pub async fn delete_brand(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    let series = state.series(tenant).list().await?;
    if series.iter().any(|s| s.brand_id == id) {
        return Err(ShopError::Conflict(
            "brand still has device series; delete them first".to_string(),
        ));
    }
    state.brands(tenant).delete(id).await?;
    catalog_changed(state, tenant).await?;
    info!(tenant, brand_id = %id, "Brand deleted");
    Ok(())
}

pub async fn create_series(
    state: &AppState,
    tenant: &str,
    mut series: DeviceSeries,
) -> Result<DeviceSeries, ShopError> {
    check_name(&series.name)?;
    state.brands(tenant).get_or_err(&series.brand_id).await?;
    ensure_slug(&mut series.slug, &series.name);
    let siblings = series_of(state, tenant, &series.brand_id).await?;
    check_slug_free(
        "series",
        &series.slug,
        "",
        siblings.iter().map(|s| (s.id.as_str(), s.slug.as_str())),
    )?;
    series.id = new_id();
    series.order = next_order(&siblings);
    let series = state.series(tenant).insert(series).await?;
    catalog_changed(state, tenant).await?;
    info!(tenant, series_id = %series.id, "Device series created");
    Ok(series)
}

pub async fn update_series(
    state: &AppState,
    tenant: &str,
    id: &str,
    mut series: DeviceSeries,
) -> Result<DeviceSeries, ShopError> {
    check_name(&series.name)?;
    let current = state.series(tenant).get_or_err(id).await?;
    state.brands(tenant).get_or_err(&series.brand_id).await?;
    ensure_slug(&mut series.slug, &series.name);
    let siblings = series_of(state, tenant, &series.brand_id).await?;
    check_slug_free(
        "series",
        &series.slug,
        &current.id,
        siblings.iter().map(|s| (s.id.as_str(), s.slug.as_str())),
    )?;
    series.id = current.id;
    series.order = current.order;
    let series = state.series(tenant).save(series).await?;
    catalog_changed(state, tenant).await?;
    Ok(series)
}

pub async fn delete_series(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    let models = state.models(tenant).list().await?;
    if models.iter().any(|m| m.series_id == id) {
        return Err(ShopError::Conflict(
            "series still has device models; delete them first".to_string(),
        ));
    }
    state.series(tenant).delete(id).await?;
    catalog_changed(state, tenant).await?;
    Ok(())
}

async fn check_model_parents(
    state: &AppState,
    tenant: &str,
    model: &DeviceModel,
) -> Result<(), ShopError> {
    let series = state.series(tenant).get_or_err(&model.series_id).await?;
    if series.brand_id != model.brand_id {
        return Err(ShopError::Validation(format!(
            "series '{}' does not belong to brand '{}'",
            series.id, model.brand_id
        )));
    }
    Ok(())
}

pub async fn create_model(
    state: &AppState,
    tenant: &str,
    mut model: DeviceModel,
) -> Result<DeviceModel, ShopError> {
    check_name(&model.name)?;
    check_model_parents(state, tenant, &model).await?;
    ensure_slug(&mut model.slug, &model.name);
    let siblings = models_of(state, tenant, &model.series_id).await?;
    check_slug_free(
        "model",
        &model.slug,
        "",
        siblings.iter().map(|m| (m.id.as_str(), m.slug.as_str())),
    )?;
    model.id = new_id();
    model.order = next_order(&siblings);
    let model = state.models(tenant).insert(model).await?;
    catalog_changed(state, tenant).await?;
    info!(tenant, model_id = %model.id, "Device model created");
    Ok(model)
}

pub async fn update_model(
    state: &AppState,
    tenant: &str,
    id: &str,
    mut model: DeviceModel,
) -> Result<DeviceModel, ShopError> {
    check_name(&model.name)?;
    let current = state.models(tenant).get_or_err(id).await?;
    check_model_parents(state, tenant, &model).await?;
    ensure_slug(&mut model.slug, &model.name);
    let siblings = models_of(state, tenant, &model.series_id).await?;
    check_slug_free(
        "model",
        &model.slug,
        &current.id,
        siblings.iter().map(|m| (m.id.as_str(), m.slug.as_str())),
    )?;
    model.id = current.id;
    model.order = current.order;
    let model = state.models(tenant).save(model).await?;
    catalog_changed(state, tenant).await?;
    Ok(model)
}

pub async fn delete_model(state: &AppState, tenant: &str, id: &str) -> Result<(), ShopError> {
    state.models(tenant).delete(id).await?;
    catalog_changed(state, tenant).await?;
    Ok(())
}

/// Rewrite the manual order of one catalog level (`/api/devices/reorder`).
pub async fn reorder(
    state: &AppState,
    tenant: &str,
    request: &ReorderRequest,
) -> Result<CatalogItems, ShopError> {
    let parent = || {
        request
            .parent_id
            .as_deref()
            .ok_or_else(|| ShopError::Validation("parentId is required".to_string()))
    };

    let items = match request.level {
        CatalogLevel::Brands => {
            let siblings = state.brands(tenant).list().await?;
            CatalogItems::Brands(apply_order(&state.brands(tenant), siblings, &request.ids).await?)
        }
        CatalogLevel::Series => {
            let brand_id = parent()?;
            let siblings = series_of(state, tenant, brand_id).await?;
            CatalogItems::Series(apply_order(&state.series(tenant), siblings, &request.ids).await?)
        }
        CatalogLevel::Models => {
            let series_id = parent()?;
            let siblings = models_of(state, tenant, series_id).await?;
            CatalogItems::Models(apply_order(&state.models(tenant), siblings, &request.ids).await?)
        }
    };

    catalog_changed(state, tenant).await?;
    info!(tenant, level = ?request.level, count = items.len(), "Catalog reordered");
    Ok(items)
}
