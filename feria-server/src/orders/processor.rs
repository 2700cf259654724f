//! Order Transaction Processor
//!
//! 接收候选订单，在单个数据库事务内完成校验与提交：
//!
//! 1. 访客必须存在
//! 2. 每个商品必须存在、在售、库存充足 (按调用方给出的顺序校验，
//!    第一个失败的商品即中止，不聚合多个错误)
//! 3. 以服务端读到的单价重算总额，与调用方声称的总额比对 (容差 0.01)
//! 4. 写入订单、订单项 (记录服务端单价快照)、扣减库存
//!
//! 任一步失败则整个事务回滚，存储状态与调用前完全一致——绝不出现
//! 只有部分行落库的中间状态。通知广播由调用方在提交成功后自行处理。

use sqlx::{Connection, SqlitePool};

use shared::models::{
    CreateOrderRequest, Order, OrderItemDetail, OrderWithItems, PaymentStatus,
    ValidatePaymentRequest,
};
use shared::util::{now_millis, snowflake_id};
use shared::{AppError, AppResult, ErrorCode};

/// 金额比对的绝对容差，吸收客户端浮点运算的舍入误差
const TOTAL_TOLERANCE: f64 = 0.01;

/// Product fields read inside the transaction
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: f64,
    stock: i64,
    is_active: bool,
}

/// A line item that passed validation, carrying the server-read unit price
#[derive(Debug)]
struct ValidatedItem {
    product_id: i64,
    name: String,
    quantity: i64,
    unit_price: f64,
}

/// 订单事务处理器
///
/// 持有显式注入的连接池；所有共享可变状态 (`product.stock`) 只在
/// 这里的事务内被读写。
#[derive(Debug, Clone)]
pub struct OrderProcessor {
    pool: SqlitePool,
}

impl OrderProcessor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建订单 (原子提交或整体拒绝)
    ///
    /// 成功返回已落库的订单及其订单项 (含商品名称)。
    pub async fn create_order(&self, req: CreateOrderRequest) -> AppResult<OrderWithItems> {
        // ── 入参校验 (不触碰事务) ──────────────────────────────
        if req.items.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyOrder));
        }
        if !req.total_amount.is_finite() || req.total_amount <= 0.0 {
            return Err(AppError::validation(
                "Total amount must be a positive number",
            ));
        }
        for item in &req.items {
            if item.quantity <= 0 {
                return Err(AppError::validation(
                    "Each item must have valid product_id and quantity",
                ));
            }
        }

        // BEGIN IMMEDIATE: 立即拿写锁，并发下单在此串行化；
        // 后到者等待 (busy_timeout) 后重读库存，而不是在提交时撞上
        // SQLITE_BUSY_SNAPSHOT
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let mut tx = conn
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(db_err)?;

        // ── 前置条件 1: 访客存在 ───────────────────────────────
        let visitor: Option<i64> = sqlx::query_scalar("SELECT id FROM visitor WHERE id = ?")
            .bind(req.visitor_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if visitor.is_none() {
            return Err(AppError::new(ErrorCode::VisitorNotFound)
                .with_detail("visitor_id", req.visitor_id));
        }

        // ── 前置条件 2-4: 逐项校验商品，同时累计服务端总额 ─────
        let mut calculated_total = 0.0;
        let mut validated: Vec<ValidatedItem> = Vec::with_capacity(req.items.len());

        for item in &req.items {
            let product: Option<ProductRow> = sqlx::query_as(
                "SELECT id, name, price, stock, is_active FROM product WHERE id = ?",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;

            let Some(product) = product else {
                return Err(AppError::with_message(
                    ErrorCode::ProductNotFound,
                    format!("Product with ID {} not found", item.product_id),
                )
                .with_detail("product_id", item.product_id));
            };

            if !product.is_active {
                return Err(AppError::with_message(
                    ErrorCode::ProductNotAvailable,
                    format!("Product {} is not available", product.name),
                )
                .with_detail("product_id", product.id));
            }

            if product.stock < item.quantity {
                return Err(insufficient_stock(&product.name, product.stock, item.quantity)
                    .with_detail("product_id", product.id));
            }

            calculated_total += product.price * item.quantity as f64;
            validated.push(ValidatedItem {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        // ── 前置条件 5: 金额复核 (服务端价格为准) ──────────────
        if (calculated_total - req.total_amount).abs() > TOTAL_TOLERANCE {
            return Err(AppError::with_message(
                ErrorCode::TotalMismatch,
                format!(
                    "Total amount mismatch. Calculated: {}, Provided: {}",
                    calculated_total, req.total_amount
                ),
            )
            .with_detail("calculated", calculated_total)
            .with_detail("provided", req.total_amount));
        }

        // ── 写入: 订单 + 订单项 + 扣库存，同一事务 ─────────────
        let order_id = snowflake_id();
        let created_at = now_millis();
        sqlx::query(
            "INSERT INTO orders (id, visitor_id, total_amount, payment_status, payment_proof_url, created_at) VALUES (?, ?, ?, 'pending', ?, ?)",
        )
        .bind(order_id)
        .bind(req.visitor_id)
        .bind(req.total_amount)
        .bind(&req.payment_proof_url)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for item in &validated {
            sqlx::query(
                "INSERT INTO order_item (id, order_id, product_id, quantity, unit_price) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(snowflake_id())
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            // stock >= ? 守卫: 并发竞争同一件库存时，后到的事务在这里拿到
            // rows_affected == 0，整体回滚，杜绝超卖
            let updated = sqlx::query(
                "UPDATE product SET stock = stock - ?, updated_at = ? WHERE id = ? AND stock >= ?",
            )
            .bind(item.quantity)
            .bind(created_at)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if updated.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock FROM product WHERE id = ?")
                        .bind(item.product_id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(db_err)?;
                return Err(insufficient_stock(&item.name, available, item.quantity)
                    .with_detail("product_id", item.product_id));
            }
        }

        tx.commit().await.map_err(db_err)?;

        let order = Order {
            id: order_id,
            visitor_id: req.visitor_id,
            total_amount: req.total_amount,
            payment_status: PaymentStatus::Pending,
            payment_proof_url: req.payment_proof_url,
            admin_notes: None,
            created_at,
            validated_at: None,
        };
        let items = validated
            .into_iter()
            .map(|v| OrderItemDetail {
                product_id: v.product_id,
                quantity: v.quantity,
                unit_price: v.unit_price,
                name: v.name,
            })
            .collect();

        tracing::info!(
            order_id,
            visitor_id = req.visitor_id,
            total = req.total_amount,
            "Order committed"
        );

        Ok(OrderWithItems { order, items })
    }

    /// 支付审核 (pending → approved | rejected，恰好一次)
    ///
    /// 不触碰库存：库存在下单时已经扣减，驳回支付不回补
    /// (与既有业务行为保持一致)。
    pub async fn validate_payment(
        &self,
        order_id: i64,
        req: ValidatePaymentRequest,
    ) -> AppResult<Order> {
        if req.status == PaymentStatus::Pending {
            return Err(AppError::validation(
                "Status must be either \"approved\" or \"rejected\"",
            ));
        }

        let current: Option<PaymentStatus> =
            sqlx::query_scalar("SELECT payment_status FROM orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        let Some(current) = current else {
            return Err(AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id));
        };
        if current != PaymentStatus::Pending {
            return Err(AppError::new(ErrorCode::OrderAlreadyValidated));
        }

        // payment_status = 'pending' 守卫: 两个管理员同时审核时只有一个生效
        let validated_at = now_millis();
        let updated = sqlx::query(
            "UPDATE orders SET payment_status = ?, admin_notes = ?, validated_at = ? WHERE id = ? AND payment_status = 'pending'",
        )
        .bind(req.status)
        .bind(&req.admin_notes)
        .bind(validated_at)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            return Err(AppError::new(ErrorCode::OrderAlreadyValidated));
        }

        tracing::info!(order_id, status = ?req.status, "Payment validated");

        let order = sqlx::query_as::<_, Order>(
            "SELECT id, visitor_id, total_amount, payment_status, payment_proof_url, admin_notes, created_at, validated_at FROM orders WHERE id = ?",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(order)
    }
}

fn insufficient_stock(name: &str, available: i64, requested: i64) -> AppError {
    AppError::with_message(
        ErrorCode::InsufficientStock,
        format!(
            "Insufficient stock for {}. Available: {}, Requested: {}",
            name, available, requested
        ),
    )
    .with_detail("available", available)
    .with_detail("requested", requested)
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::database(e.to_string())
}
