//! Order Repository
//!
//! Read paths and proof-URL updates. Order creation and payment validation
//! are transactional and live in [`crate::orders::OrderProcessor`].

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderItemDetail, OrderStats, OrderWithItems, PaymentStatus};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Arguments, SqlitePool};

const ORDER_SELECT: &str = "SELECT id, visitor_id, total_amount, payment_status, payment_proof_url, admin_notes, created_at, validated_at FROM orders";

const ITEM_SELECT: &str = "SELECT oi.product_id, oi.quantity, oi.unit_price, COALESCE(p.name, 'Deleted product') as name FROM order_item oi LEFT JOIN product p ON oi.product_id = p.id WHERE oi.order_id = ? ORDER BY oi.id";

/// List filter (payment status / visitor)
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<PaymentStatus>,
    pub visitor_id: Option<i64>,
}

fn build_where(filter: &OrderFilter, args: &mut SqliteArguments<'_>) -> RepoResult<String> {
    let mut conditions: Vec<&str> = Vec::new();
    if let Some(status) = filter.status {
        conditions.push("payment_status = ?");
        args.add(status)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if let Some(visitor_id) = filter.visitor_id {
        conditions.push("visitor_id = ?");
        args.add(visitor_id)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if conditions.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

pub async fn find_all(
    pool: &SqlitePool,
    filter: &OrderFilter,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<OrderWithItems>> {
    let mut args = SqliteArguments::default();
    let where_clause = build_where(filter, &mut args)?;
    args.add(limit)
        .map_err(|e| RepoError::Database(e.to_string()))?;
    args.add(offset)
        .map_err(|e| RepoError::Database(e.to_string()))?;
    let sql = format!("{ORDER_SELECT}{where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?");
    let orders = sqlx::query_as_with::<_, Order, _>(&sql, args)
        .fetch_all(pool)
        .await?;

    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let items = items_for_order(pool, order.id).await?;
        result.push(OrderWithItems { order, items });
    }
    Ok(result)
}

pub async fn count(pool: &SqlitePool, filter: &OrderFilter) -> RepoResult<i64> {
    let mut args = SqliteArguments::default();
    let where_clause = build_where(filter, &mut args)?;
    let sql = format!("SELECT COUNT(*) FROM orders{where_clause}");
    let total = sqlx::query_scalar_with::<_, i64, _>(&sql, args)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ?", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_with_items(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderWithItems>> {
    let Some(order) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let items = items_for_order(pool, id).await?;
    Ok(Some(OrderWithItems { order, items }))
}

pub async fn items_for_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItemDetail>> {
    let rows = sqlx::query_as::<_, OrderItemDetail>(ITEM_SELECT)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Replace the payment proof reference; returns the previous one (for blob cleanup)
pub async fn update_payment_proof(
    pool: &SqlitePool,
    id: i64,
    url: &str,
) -> RepoResult<Option<String>> {
    let old: Option<Option<String>> =
        sqlx::query_scalar("SELECT payment_proof_url FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let Some(old) = old else {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    };
    sqlx::query("UPDATE orders SET payment_proof_url = ? WHERE id = ?")
        .bind(url)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(old)
}

/// Aggregate statistics, optionally restricted by creation date range (millis)
pub async fn stats(
    pool: &SqlitePool,
    date_from: Option<i64>,
    date_to: Option<i64>,
) -> RepoResult<OrderStats> {
    let mut args = SqliteArguments::default();
    let mut conditions: Vec<&str> = Vec::new();
    if let Some(from) = date_from {
        conditions.push("created_at >= ?");
        args.add(from)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    if let Some(to) = date_to {
        conditions.push("created_at <= ?");
        args.add(to)
            .map_err(|e| RepoError::Database(e.to_string()))?;
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT \
            COUNT(*) as total_orders, \
            COUNT(CASE WHEN payment_status = 'pending' THEN 1 END) as pending_orders, \
            COUNT(CASE WHEN payment_status = 'approved' THEN 1 END) as approved_orders, \
            COUNT(CASE WHEN payment_status = 'rejected' THEN 1 END) as rejected_orders, \
            COALESCE(SUM(CASE WHEN payment_status = 'approved' THEN total_amount ELSE 0 END), 0.0) as total_revenue, \
            COALESCE(AVG(CASE WHEN payment_status = 'approved' THEN total_amount END), 0.0) as average_order_value \
         FROM orders{where_clause}"
    );
    let stats = sqlx::query_as_with::<_, OrderStats, _>(&sql, args)
        .fetch_one(pool)
        .await?;
    Ok(stats)
}
