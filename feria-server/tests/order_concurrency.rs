//! 订单并发测试 - 并发抢购不超卖
//!
//! 使用临时目录中的真实 SQLite 文件 (WAL)，多任务同时下单，
//! 验证已提交数量之和永不超过初始库存。

use std::sync::Arc;

use feria_server::db::repository::{product, visitor};
use feria_server::db::DbService;
use feria_server::{ErrorCode, OrderProcessor};
use shared::models::{CreateOrderRequest, OrderItemInput, ProductCreate, VisitorCreate};
use shared::util::badge_token;

async fn setup(stock: i64) -> (tempfile::TempDir, OrderProcessor, i64, i64) {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let db_path = dir.path().join("feria_test.db");
    let db = DbService::new(&db_path.to_string_lossy())
        .await
        .expect("db init");

    let visitor = visitor::create(
        &db.pool,
        &badge_token(),
        VisitorCreate {
            visitor_name: "Concurrent Carla".to_string(),
            booking_reference: "BK-RACE".to_string(),
            guest_count: Some(1),
            phone: None,
            email: None,
            company: None,
            purpose: None,
        },
    )
    .await
    .expect("seed visitor");

    let product = product::create(
        &db.pool,
        ProductCreate {
            name: "Entrada VIP".to_string(),
            price: 25.00,
            stock: Some(stock),
            category: "tickets".to_string(),
            image_url: None,
        },
    )
    .await
    .expect("seed product");

    let processor = OrderProcessor::new(db.pool.clone());
    (dir, processor, visitor.id, product.id)
}

fn one_unit(visitor_id: i64, product_id: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        visitor_id,
        items: vec![OrderItemInput {
            product_id,
            quantity: 1,
        }],
        total_amount: 25.00,
        payment_proof_url: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_orders_race_for_last_unit() {
    let (dir, processor, visitor_id, product_id) = setup(1).await;
    let processor = Arc::new(processor);

    // 两个订单同时抢最后一件
    let a = {
        let p = processor.clone();
        tokio::spawn(async move { p.create_order(one_unit(visitor_id, product_id)).await })
    };
    let b = {
        let p = processor.clone();
        tokio::spawn(async move { p.create_order(one_unit(visitor_id, product_id)).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    // 恰好一单成功，另一单因库存不足被拒
    assert_eq!(ok, 1, "exactly one order must commit");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].code, ErrorCode::InsufficientStock);

    let db = DbService::new(&dir.path().join("feria_test.db").to_string_lossy())
        .await
        .unwrap();
    let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = ?")
        .bind(product_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_oversell_under_contention() {
    const STOCK: i64 = 10;
    const ATTEMPTS: usize = 25;

    let (dir, processor, visitor_id, product_id) = setup(STOCK).await;
    let processor = Arc::new(processor);

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for _ in 0..ATTEMPTS {
        let p = processor.clone();
        handles.push(tokio::spawn(async move {
            p.create_order(one_unit(visitor_id, product_id)).await
        }));
    }

    let mut committed = 0usize;
    let mut rejected = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => {
                assert_eq!(e.code, ErrorCode::InsufficientStock, "unexpected error: {e}");
                rejected += 1;
            }
        }
    }

    println!("committed: {committed}, rejected: {rejected}");
    assert_eq!(committed, STOCK as usize, "all stock must be sold exactly once");
    assert_eq!(rejected, ATTEMPTS - STOCK as usize);

    // 库存归零，已提交数量之和等于初始库存
    let db = DbService::new(&dir.path().join("feria_test.db").to_string_lossy())
        .await
        .unwrap();
    let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = ?")
        .bind(product_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(stock, 0);

    let sold: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM order_item WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(sold, STOCK);

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(orders, STOCK);
}
