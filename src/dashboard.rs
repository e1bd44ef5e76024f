//! Admin dashboard: one tab at a time, or a full snapshot with stats.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::app::AppState;
use crate::core::models::{
    Accessory, Customer, Order, OrderStatus, Part, Quote, QuoteStatus, Repair, RepairStatus,
};
use crate::errors::ShopError;
use crate::{customers, inventory, orders, quotes, repairs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardTab {
    #[default]
    Overview,
    Repairs,
    Customers,
    Parts,
    Accessories,
    Quotes,
    Orders,
}

impl DashboardTab {
    /// Parse the `tab` query parameter. Unknown names fall back to the overview.
    #[must_use]
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("repairs") => Self::Repairs,
            Some("customers") => Self::Customers,
            Some("parts") => Self::Parts,
            Some("accessories") => Self::Accessories,
            Some("quotes") => Self::Quotes,
            Some("orders") => Self::Orders,
            _ => Self::Overview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount<S> {
    pub status: S,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub repairs_by_status: Vec<StatusCount<RepairStatus>>,
    pub open_repairs: usize,
    pub pending_quotes: usize,
    pub low_stock_parts: usize,
    pub out_of_stock_accessories: usize,
    pub orders_by_status: Vec<StatusCount<OrderStatus>>,
    pub customer_count: usize,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub repairs: Vec<Repair>,
    pub customers: Vec<Customer>,
    pub parts: Vec<Part>,
    pub accessories: Vec<Accessory>,
    pub quotes: Vec<Quote>,
    pub orders: Vec<Order>,
}

/// Payload of a single tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tab", content = "data", rename_all = "camelCase")]
pub enum TabData {
    Overview(DashboardStats),
    Repairs(Vec<Repair>),
    Customers(Vec<Customer>),
    Parts(Vec<Part>),
    Accessories(Vec<Accessory>),
    Quotes(Vec<Quote>),
    Orders(Vec<Order>),
}

/// Counts and revenue over already loaded collections.
#[must_use]
pub fn compute_stats(
    repairs: &[Repair],
    customers: &[Customer],
    parts: &[Part],
    accessories: &[Accessory],
    quotes: &[Quote],
    orders: &[Order],
) -> DashboardStats {
    let repairs_by_status = RepairStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: repairs.iter().filter(|r| r.status == status).count(),
        })
        .collect();
    let orders_by_status = OrderStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: orders.iter().filter(|o| o.status == status).count(),
        })
        .collect();

    let repair_revenue: i64 = repairs
        .iter()
        .filter(|r| r.status == RepairStatus::Completed)
        .filter_map(|r| r.final_cost_cents)
        .sum();
    let order_revenue: i64 = orders
        .iter()
        .filter(|o| o.status.counts_as_revenue())
        .map(|o| o.total_cents)
        .sum();

    DashboardStats {
        repairs_by_status,
        open_repairs: repairs.iter().filter(|r| !r.status.is_terminal()).count(),
        pending_quotes: quotes.iter().filter(|q| q.status == QuoteStatus::New).count(),
        low_stock_parts: parts
            .iter()
            .filter(|p| p.active && p.in_stock <= p.low_stock_threshold)
            .count(),
        out_of_stock_accessories: accessories
            .iter()
            .filter(|a| a.active && a.in_stock == 0)
            .count(),
        orders_by_status,
        customer_count: customers.len(),
        revenue_cents: repair_revenue + order_revenue,
    }
}

/// Everything the dashboard shows, loaded concurrently.
#[instrument(skip(state))]
pub async fn snapshot(state: &AppState, tenant: &str) -> Result<DashboardSnapshot, ShopError> {
    let (repairs, customers, parts, accessories, quotes, orders) = futures::try_join!(
        repairs::list(state, tenant),
        customers::list(state, tenant),
        inventory::list_parts(state, tenant, true),
        inventory::list_accessories(state, tenant, true),
        quotes::list(state, tenant),
        orders::list(state, tenant),
    )?;
    let stats = compute_stats(&repairs, &customers, &parts, &accessories, &quotes, &orders);
    debug!(
        tenant,
        open_repairs = stats.open_repairs,
        revenue_cents = stats.revenue_cents,
        "Dashboard snapshot loaded"
    );
    Ok(DashboardSnapshot {
        stats,
        repairs,
        customers,
        parts,
        accessories,
        quotes,
        orders,
    })
}

/// Only the data the selected tab needs.
pub async fn load_tab(
    state: &AppState,
    tenant: &str,
    tab: DashboardTab,
) -> Result<TabData, ShopError> {
    Ok(match tab {
        DashboardTab::Overview => TabData::Overview(snapshot(state, tenant).await?.stats),
        DashboardTab::Repairs => TabData::Repairs(repairs::list(state, tenant).await?),
        DashboardTab::Customers => TabData::Customers(customers::list(state, tenant).await?),
        DashboardTab::Parts => TabData::Parts(inventory::list_parts(state, tenant, true).await?),
        DashboardTab::Accessories => {
            TabData::Accessories(inventory::list_accessories(state, tenant, true).await?)
        }
        DashboardTab::Quotes => TabData::Quotes(quotes::list(state, tenant).await?),
        DashboardTab::Orders => TabData::Orders(orders::list(state, tenant).await?),
    })
}
