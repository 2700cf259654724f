//! Order Model

use serde::{Deserialize, Serialize};

/// Payment review state
///
/// Starts at `pending`; moved exactly once to `approved` or `rejected` by an
/// admin. Rejection does not restock inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub visitor_id: i64,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_proof_url: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: i64,
    pub validated_at: Option<i64>,
}

/// Order line item entity
///
/// `unit_price` is a snapshot of the product price at order time; later
/// price changes never alter it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

/// Line item joined with the product display name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItemDetail {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub name: String,
}

/// Order with its resolved line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// One requested line in a candidate order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Candidate order, already parsed and typed
///
/// The HTTP layer converts the wire shape (numeric strings, `items` as JSON
/// text, optional multipart file) into this struct; malformed values are
/// rejected before the transaction is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub visitor_id: i64,
    pub items: Vec<OrderItemInput>,
    pub total_amount: f64,
    pub payment_proof_url: Option<String>,
}

/// Payment validation request (admin decision)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePaymentRequest {
    pub status: PaymentStatus,
    pub admin_notes: Option<String>,
}

/// Aggregated order statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub rejected_orders: i64,
    /// Sum of approved order totals
    pub total_revenue: f64,
    /// Mean approved order total (0 when none)
    pub average_order_value: f64,
}
