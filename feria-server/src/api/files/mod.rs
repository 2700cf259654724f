//! 上传文件访问接口
//!
//! 提供 `/uploads/{category}/{filename}` 的只读访问，内容类型由扩展名
//! 推断。路径穿越在 [`crate::storage::FileStorage::resolve`] 中拦截。

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::header;

use crate::core::ServerState;
use shared::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/uploads/{category}/{filename}", get(serve))
}

async fn serve(
    State(state): State<ServerState>,
    Path((category, filename)): Path<(String, String)>,
) -> AppResult<Response> {
    let path = state.storage().resolve(&category, &filename)?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::storage(format!("Failed to read file: {e}")))?;

    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}
