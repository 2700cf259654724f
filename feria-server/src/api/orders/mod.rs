//! Order API 模块

mod handler;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // 下单：公共路由 (访客结账)
        .route("/", post(handler::create).get(handler::list))
        // 回执查询：公共路由
        .route("/{id}", get(handler::get_by_id))
        // 支付审核
        .route("/{id}/validate", put(handler::validate))
        // 支付凭证上传/替换：公共路由
        .route("/{id}/payment-proof", post(handler::upload_payment_proof))
        // 统计
        .route("/stats/summary", get(handler::stats))
}
