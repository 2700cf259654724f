//! 订单事务处理器测试
//!
//! 每个测试使用独立的内存数据库 (已套用全部迁移)。

use sqlx::SqlitePool;

use super::OrderProcessor;
use crate::db::repository::{product, visitor};
use crate::db::DbService;
use shared::models::{
    CreateOrderRequest, OrderItemInput, PaymentStatus, ProductCreate, ProductUpdate,
    ValidatePaymentRequest, VisitorCreate,
};
use shared::util::badge_token;
use shared::ErrorCode;

async fn test_pool() -> SqlitePool {
    DbService::new_in_memory()
        .await
        .expect("in-memory db")
        .pool
}

async fn seed_visitor(pool: &SqlitePool) -> i64 {
    visitor::create(
        pool,
        &badge_token(),
        VisitorCreate {
            visitor_name: "Ana Torres".to_string(),
            booking_reference: "BK-1001".to_string(),
            guest_count: Some(2),
            phone: None,
            email: None,
            company: None,
            purpose: None,
        },
    )
    .await
    .expect("seed visitor")
    .id
}

async fn seed_product(pool: &SqlitePool, name: &str, price: f64, stock: i64) -> i64 {
    product::create(
        pool,
        ProductCreate {
            name: name.to_string(),
            price,
            stock: Some(stock),
            category: "drinks".to_string(),
            image_url: None,
        },
    )
    .await
    .expect("seed product")
    .id
}

async fn stock_of(pool: &SqlitePool, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM product WHERE id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn order_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn item_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_item")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn request(visitor_id: i64, items: Vec<OrderItemInput>, total: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        visitor_id,
        items,
        total_amount: total,
        payment_proof_url: None,
    }
}

// ── 创建订单 ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_order_commits_and_decrements_stock() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Horchata", 3.50, 5).await;
    let processor = OrderProcessor::new(pool.clone());

    let result = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 3,
            }],
            10.50,
        ))
        .await
        .expect("order should commit");

    assert_eq!(result.order.visitor_id, visitor_id);
    assert_eq!(result.order.payment_status, PaymentStatus::Pending);
    assert!(result.order.validated_at.is_none());
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].name, "Horchata");
    assert_eq!(result.items[0].quantity, 3);
    assert_eq!(result.items[0].unit_price, 3.50);

    assert_eq!(stock_of(&pool, product_id).await, 2);
    assert_eq!(order_count(&pool).await, 1);
    assert_eq!(item_count(&pool).await, 1);
}

#[tokio::test]
async fn test_insufficient_stock_rejects_whole_order() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Bocadillo", 5.00, 2).await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 3,
            }],
            15.00,
        ))
        .await
        .expect_err("must be rejected");

    assert_eq!(err.code, ErrorCode::InsufficientStock);
    let details = err.details.unwrap();
    assert_eq!(details.get("available").unwrap(), 2);
    assert_eq!(details.get("requested").unwrap(), 3);

    // 库存与订单表都不应被触碰
    assert_eq!(stock_of(&pool, product_id).await, 2);
    assert_eq!(order_count(&pool).await, 0);
    assert_eq!(item_count(&pool).await, 0);
}

#[tokio::test]
async fn test_total_mismatch_rejected() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Paella", 15.00, 10).await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 10,
            }],
            100.00, // calculated = 150.00
        ))
        .await
        .expect_err("must be rejected");

    assert_eq!(err.code, ErrorCode::TotalMismatch);
    let details = err.details.unwrap();
    assert_eq!(details.get("calculated").unwrap(), 150.0);
    assert_eq!(details.get("provided").unwrap(), 100.0);

    assert_eq!(stock_of(&pool, product_id).await, 10);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn test_total_within_tolerance_accepted() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Granizado", 2.95, 4).await;
    let processor = OrderProcessor::new(pool.clone());

    // calculated = 8.85; 客户端舍入到 8.86 仍在 0.01 容差内
    let result = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 3,
            }],
            8.86,
        ))
        .await
        .expect("within tolerance should commit");

    assert_eq!(result.order.total_amount, 8.86);
    assert_eq!(stock_of(&pool, product_id).await, 1);
}

#[tokio::test]
async fn test_inactive_product_rejected() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Churros", 4.00, 8).await;
    product::update(
        &pool,
        product_id,
        ProductUpdate {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 1,
            }],
            4.00,
        ))
        .await
        .expect_err("inactive product must be rejected");

    assert_eq!(err.code, ErrorCode::ProductNotAvailable);
    assert_eq!(stock_of(&pool, product_id).await, 8);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id: 999_999,
                quantity: 1,
            }],
            1.00,
        ))
        .await
        .expect_err("unknown product must be rejected");

    assert_eq!(err.code, ErrorCode::ProductNotFound);
    assert_eq!(order_count(&pool).await, 0);
}

#[tokio::test]
async fn test_missing_visitor_rejected() {
    let pool = test_pool().await;
    let product_id = seed_product(&pool, "Agua", 1.50, 10).await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .create_order(request(
            424242,
            vec![OrderItemInput {
                product_id,
                quantity: 1,
            }],
            1.50,
        ))
        .await
        .expect_err("unknown visitor must be rejected");

    assert_eq!(err.code, ErrorCode::VisitorNotFound);
    assert_eq!(stock_of(&pool, product_id).await, 10);
}

#[tokio::test]
async fn test_atomicity_on_mid_order_failure() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let first = seed_product(&pool, "Cerveza", 2.50, 10).await;
    let second = seed_product(&pool, "Tortilla", 6.00, 1).await;
    let processor = OrderProcessor::new(pool.clone());

    // 第一项可满足，第二项库存不足 → 整单回滚
    let err = processor
        .create_order(request(
            visitor_id,
            vec![
                OrderItemInput {
                    product_id: first,
                    quantity: 4,
                },
                OrderItemInput {
                    product_id: second,
                    quantity: 3,
                },
            ],
            28.00,
        ))
        .await
        .expect_err("second item must abort the order");

    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(stock_of(&pool, first).await, 10);
    assert_eq!(stock_of(&pool, second).await, 1);
    assert_eq!(order_count(&pool).await, 0);
    assert_eq!(item_count(&pool).await, 0);
}

#[tokio::test]
async fn test_first_failing_item_short_circuits() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let missing = 777_777;
    let inactive = seed_product(&pool, "Sangría", 9.00, 5).await;
    product::update(
        &pool,
        inactive,
        ProductUpdate {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let processor = OrderProcessor::new(pool.clone());

    // 两项都有问题时，报告的是第一项的错误
    let err = processor
        .create_order(request(
            visitor_id,
            vec![
                OrderItemInput {
                    product_id: missing,
                    quantity: 1,
                },
                OrderItemInput {
                    product_id: inactive,
                    quantity: 1,
                },
            ],
            9.00,
        ))
        .await
        .expect_err("must fail on the first item");

    assert_eq!(err.code, ErrorCode::ProductNotFound);
}

#[tokio::test]
async fn test_input_validation_rejections() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Café", 1.20, 10).await;
    let processor = OrderProcessor::new(pool.clone());

    // 空订单
    let err = processor
        .create_order(request(visitor_id, vec![], 1.20))
        .await
        .expect_err("empty items");
    assert_eq!(err.code, ErrorCode::EmptyOrder);

    // 非正总额
    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 1,
            }],
            0.0,
        ))
        .await
        .expect_err("non-positive total");
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    // 非正数量
    let err = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 0,
            }],
            1.20,
        ))
        .await
        .expect_err("zero quantity");
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    // 以上都不应触碰存储
    assert_eq!(order_count(&pool).await, 0);
    assert_eq!(stock_of(&pool, product_id).await, 10);
}

#[tokio::test]
async fn test_price_snapshot_immune_to_price_change() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Helado", 3.00, 10).await;
    let processor = OrderProcessor::new(pool.clone());

    let result = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 2,
            }],
            6.00,
        ))
        .await
        .unwrap();

    // 提价后，既有订单项的快照单价保持不变
    product::update(
        &pool,
        product_id,
        ProductUpdate {
            price: Some(4.50),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let items = crate::db::repository::order::items_for_order(&pool, result.order.id)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, 3.00);
}

// ── 支付审核 ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_validate_payment_approves_exactly_once() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Entrada", 12.00, 10).await;
    let processor = OrderProcessor::new(pool.clone());

    let created = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 1,
            }],
            12.00,
        ))
        .await
        .unwrap();

    let approved = processor
        .validate_payment(
            created.order.id,
            ValidatePaymentRequest {
                status: PaymentStatus::Approved,
                admin_notes: Some("transferencia verificada".to_string()),
            },
        )
        .await
        .expect("first validation succeeds");

    assert_eq!(approved.payment_status, PaymentStatus::Approved);
    assert!(approved.validated_at.is_some());
    assert_eq!(
        approved.admin_notes.as_deref(),
        Some("transferencia verificada")
    );

    // 第二次审核被拒绝，且状态与时间戳不变
    let err = processor
        .validate_payment(
            created.order.id,
            ValidatePaymentRequest {
                status: PaymentStatus::Rejected,
                admin_notes: None,
            },
        )
        .await
        .expect_err("second validation must fail");
    assert_eq!(err.code, ErrorCode::OrderAlreadyValidated);

    let after = crate::db::repository::order::find_by_id(&pool, created.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.payment_status, PaymentStatus::Approved);
    assert_eq!(after.validated_at, approved.validated_at);
}

#[tokio::test]
async fn test_validate_payment_rejection_does_not_restock() {
    let pool = test_pool().await;
    let visitor_id = seed_visitor(&pool).await;
    let product_id = seed_product(&pool, "Camiseta", 20.00, 5).await;
    let processor = OrderProcessor::new(pool.clone());

    let created = processor
        .create_order(request(
            visitor_id,
            vec![OrderItemInput {
                product_id,
                quantity: 2,
            }],
            40.00,
        ))
        .await
        .unwrap();
    assert_eq!(stock_of(&pool, product_id).await, 3);

    processor
        .validate_payment(
            created.order.id,
            ValidatePaymentRequest {
                status: PaymentStatus::Rejected,
                admin_notes: None,
            },
        )
        .await
        .unwrap();

    // 驳回支付不回补库存
    assert_eq!(stock_of(&pool, product_id).await, 3);
}

#[tokio::test]
async fn test_validate_payment_pending_is_invalid_decision() {
    let pool = test_pool().await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .validate_payment(
            1,
            ValidatePaymentRequest {
                status: PaymentStatus::Pending,
                admin_notes: None,
            },
        )
        .await
        .expect_err("pending is not a decision");
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_validate_payment_unknown_order() {
    let pool = test_pool().await;
    let processor = OrderProcessor::new(pool.clone());

    let err = processor
        .validate_payment(
            31337,
            ValidatePaymentRequest {
                status: PaymentStatus::Approved,
                admin_notes: None,
            },
        )
        .await
        .expect_err("unknown order");
    assert_eq!(err.code, ErrorCode::OrderNotFound);
}
