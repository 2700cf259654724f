//! Visitor API Handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::repository::visitor;
use crate::utils::validation::{
    validate_optional_text, validate_required_text, MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_NOTE_LEN,
    MAX_SHORT_TEXT_LEN,
};
use shared::models::{Visitor, VisitorCreate, VisitorStatus, VisitorStatusUpdate};
use shared::util::badge_token;
use shared::{AppError, AppResult, ErrorCode};

/// Query params for listing visitors
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<VisitorStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Paginated visitor list
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub visitors: Vec<Visitor>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// POST /api/visitors - 登记访客并签发徽章令牌
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<VisitorCreate>,
) -> AppResult<Json<Visitor>> {
    validate_required_text(&payload.visitor_name, "Visitor name", MAX_NAME_LEN)?;
    validate_required_text(
        &payload.booking_reference,
        "Booking order ID",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.company, "company", MAX_NAME_LEN)?;
    validate_optional_text(&payload.purpose, "purpose", MAX_NOTE_LEN)?;
    if let Some(count) = payload.guest_count
        && count < 1
    {
        return Err(AppError::validation("guest_count must be at least 1"));
    }

    let qr_data = badge_token();
    let created = visitor::create(&state.db, &qr_data, payload)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(visitor_id = created.id, name = %created.visitor_name, "Visitor registered");

    Ok(Json(created))
}

/// GET /api/visitors - 访客列表 (可按状态过滤)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let visitors = visitor::find_all(&state.db, query.status, query.limit, query.offset)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    let total = visitor::count(&state.db, query.status)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(ListResponse {
        visitors,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Badge verification result
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub visitor_id: i64,
    pub status: VisitorStatus,
}

/// GET /api/visitors/verify/{qr_data} - 徽章校验 (公共路由)
pub async fn verify(
    State(state): State<ServerState>,
    Path(qr_data): Path<String>,
) -> AppResult<Json<VerifyResponse>> {
    let found = visitor::find_by_qr_data(&state.db, &qr_data)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::BadgeNotFound))?;

    if !found.is_active {
        return Err(AppError::new(ErrorCode::BadgeDeactivated));
    }

    Ok(Json(VerifyResponse {
        valid: true,
        visitor_id: found.id,
        status: found.status,
    }))
}

/// PUT /api/visitors/{id}/status - 吊销/恢复徽章
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<VisitorStatusUpdate>,
) -> AppResult<Json<Visitor>> {
    let updated = visitor::set_active(&state.db, id, payload.is_active)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    if !updated {
        return Err(AppError::new(ErrorCode::VisitorNotFound));
    }

    let found = visitor::find_by_id(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::VisitorNotFound))?;

    tracing::info!(visitor_id = id, is_active = payload.is_active, "Badge status updated");

    Ok(Json(found))
}

/// DELETE /api/visitors/{id} - 删除访客 (通行记录级联删除)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let deleted = visitor::delete(&state.db, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    if !deleted {
        return Err(AppError::new(ErrorCode::VisitorNotFound));
    }
    Ok(Json(true))
}
