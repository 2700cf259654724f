//! Entry API 模块 (闸机扫码与通行记录)

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/entry", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // 扫码：公共路由 (闸机设备)
        .route("/scan", post(handler::scan))
        .route("/movements", get(handler::movements))
}
