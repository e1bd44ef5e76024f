use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Device catalog
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Phone,
    Tablet,
    Laptop,
    Console,
    Watch,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSeries {
    #[serde(default)]
    pub id: String,
    pub brand_id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceModel {
    #[serde(default)]
    pub id: String,
    pub brand_id: String,
    pub series_id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub release_year: Option<u16>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

// ============================================================================
// Inventory
// ============================================================================

/// Sellable inventory kinds. Carts, orders and wishlists reference items by kind + id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Part,
    Accessory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub sku: String,
    pub category: String,
    #[serde(default)]
    pub compatible_model_ids: Vec<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub in_stock: u32,
    #[serde(default = "default_low_stock")]
    pub low_stock_threshold: u32,
    pub supplier: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub brand: Option<String>,
    pub category: String,
    pub price_cents: i64,
    pub compare_at_cents: Option<i64>,
    #[serde(default)]
    pub in_stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Customers, repairs, quotes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairStatus {
    Received,
    Diagnosing,
    AwaitingParts,
    InProgress,
    ReadyForPickup,
    Completed,
    Cancelled,
}

impl RepairStatus {
    pub const ALL: [RepairStatus; 7] = [
        RepairStatus::Received,
        RepairStatus::Diagnosing,
        RepairStatus::AwaitingParts,
        RepairStatus::InProgress,
        RepairStatus::ReadyForPickup,
        RepairStatus::Completed,
        RepairStatus::Cancelled,
    ];

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RepairStatus::Completed | RepairStatus::Cancelled)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RepairStatus::Received => "Received",
            RepairStatus::Diagnosing => "Diagnosing",
            RepairStatus::AwaitingParts => "Awaiting parts",
            RepairStatus::InProgress => "In progress",
            RepairStatus::ReadyForPickup => "Ready for pickup",
            RepairStatus::Completed => "Completed",
            RepairStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUsage {
    pub part_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repair {
    pub id: String,
    pub ticket_number: String,
    pub customer_id: String,
    pub device_model_id: Option<String>,
    pub device_label: String,
    pub issue: String,
    pub status: RepairStatus,
    pub estimated_cost_cents: Option<i64>,
    pub final_cost_cents: Option<i64>,
    #[serde(default)]
    pub parts_used: Vec<PartUsage>,
    pub technician_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    New,
    Responded,
    Accepted,
    Declined,
    Converted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub device_model_id: Option<String>,
    pub device_label: String,
    pub issue: String,
    pub preferred_contact: Option<String>,
    pub status: QuoteStatus,
    pub estimated_cost_cents: Option<i64>,
    pub admin_notes: Option<String>,
    pub repair_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Cart & orders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub kind: ItemKind,
    pub item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(i64::from(self.quantity))
    }

    /// Like [`CartItem::line_total_cents`], but `None` on overflow.
    #[must_use]
    pub fn checked_line_total_cents(&self) -> Option<i64> {
        self.unit_price_cents.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub session_id: String,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    #[must_use]
    pub fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn subtotal_cents(&self) -> i64 {
        self.items
            .iter()
            .map(CartItem::line_total_cents)
            .fold(0, i64::saturating_add)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.quantity)
            .fold(0, u32::saturating_add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Whether money for the order has been collected and kept.
    #[must_use]
    pub fn counts_as_revenue(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Processing
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending payment",
            OrderStatus::Paid => "Paid",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub number: String,
    pub session_id: String,
    pub contact: ContactInfo,
    pub shipping_address: String,
    pub items: Vec<CartItem>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Storefront extras
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub session_id: String,
    pub kind: ItemKind,
    pub item_id: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub responded: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_low_stock() -> u32 {
    3
}
