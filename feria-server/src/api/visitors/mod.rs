//! Visitor API 模块

mod handler;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/visitors", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        // 徽章校验：公共路由 (闸机设备)
        .route("/verify/{qr_data}", get(handler::verify))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}", axum::routing::delete(handler::delete))
}
