//! Entry API Handlers
//!
//! 闸机扫码状态机：
//!
//! | 当前状态 | entry | exit |
//! |----------|-------|------|
//! | registered | → entered | 拒绝 (还未入场) |
//! | entered | 拒绝 (已在场内) | → exited |
//! | exited | → entered (重新入场) | 拒绝 (已离场) |

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::repository::visitor;
use shared::message::{EventType, MovementEvent, StatusEvent};
use shared::models::{MovementAction, MovementWithVisitor, ScanRequest, ScanResult, VisitorStatus};
use shared::util::now_millis;
use shared::{AppError, AppResult, ErrorCode};

const DEFAULT_GATE: &str = "Main Gate";
const DEFAULT_SCANNER: &str = "Admin";

/// 状态机转移；非法转移返回对应错误码
fn transition(
    action: MovementAction,
    status: VisitorStatus,
) -> Result<(VisitorStatus, &'static str), ErrorCode> {
    match (action, status) {
        (MovementAction::Entry, VisitorStatus::Registered) => Ok((
            VisitorStatus::Entered,
            "Welcome! Visitor has entered successfully.",
        )),
        (MovementAction::Entry, VisitorStatus::Exited) => Ok((
            VisitorStatus::Entered,
            "Welcome back! Visitor has re-entered.",
        )),
        (MovementAction::Entry, VisitorStatus::Entered) => Err(ErrorCode::VisitorAlreadyInside),
        (MovementAction::Exit, VisitorStatus::Entered) => Ok((
            VisitorStatus::Exited,
            "Goodbye! Visitor has exited successfully.",
        )),
        (MovementAction::Exit, VisitorStatus::Registered) => Err(ErrorCode::VisitorNotEntered),
        (MovementAction::Exit, VisitorStatus::Exited) => Err(ErrorCode::VisitorAlreadyExited),
    }
}

/// POST /api/entry/scan - 扫码入场/离场 (公共路由)
pub async fn scan(
    State(state): State<ServerState>,
    Json(req): Json<ScanRequest>,
) -> AppResult<Json<ScanResult>> {
    if req.qr_data.trim().is_empty() {
        return Err(AppError::validation("QR data is required"));
    }

    let found = visitor::find_by_qr_data(&state.db, &req.qr_data)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::BadgeNotFound))?;

    let now = now_millis();

    // 非法转移直接拒绝，不写任何记录
    let (new_status, message) =
        transition(req.action, found.status).map_err(AppError::new)?;

    match new_status {
        VisitorStatus::Entered => visitor::mark_entered(&state.db, found.id, now).await,
        VisitorStatus::Exited => visitor::mark_exited(&state.db, found.id, now).await,
        VisitorStatus::Registered => unreachable!("scan never yields registered"),
    }
    .map_err(|e| AppError::database(e.to_string()))?;

    let gate_location = req.gate_location.as_deref().unwrap_or(DEFAULT_GATE);
    let scanned_by = req.scanned_by.as_deref().unwrap_or(DEFAULT_SCANNER);
    visitor::record_movement(&state.db, found.id, req.action, gate_location, scanned_by, now)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // 实时推送 (管理端仪表盘 + 访客状态页)；投递失败不影响扫码结果
    state.broadcast(
        EventType::VisitorMovement,
        "visitor",
        &MovementEvent {
            visitor_id: found.id,
            visitor_name: found.visitor_name.clone(),
            booking_reference: found.booking_reference.clone(),
            action: req.action,
            status: new_status,
            timestamp: now,
            gate_location: gate_location.to_string(),
            scanned_by: scanned_by.to_string(),
        },
    );
    state.broadcast(
        EventType::VisitorStatus,
        "visitor",
        &StatusEvent {
            visitor_id: found.id,
            status: new_status,
            message: message.to_string(),
            timestamp: now,
        },
    );

    tracing::info!(
        visitor_id = found.id,
        action = ?req.action,
        status = ?new_status,
        gate = gate_location,
        "Gate scan accepted"
    );

    Ok(Json(ScanResult {
        visitor_id: found.id,
        visitor_name: found.visitor_name,
        action: req.action,
        status: new_status,
        timestamp: now,
        message: message.to_string(),
    }))
}

/// Query params for the movement history
#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub visitor_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Paginated movement history
#[derive(Debug, Serialize)]
pub struct MovementsResponse {
    pub movements: Vec<MovementWithVisitor>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/entry/movements - 通行记录
pub async fn movements(
    State(state): State<ServerState>,
    Query(query): Query<MovementsQuery>,
) -> AppResult<Json<MovementsResponse>> {
    let movements =
        visitor::find_movements(&state.db, query.visitor_id, query.limit, query.offset)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
    let total = visitor::count_movements(&state.db, query.visitor_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(MovementsResponse {
        movements,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_transitions() {
        assert_eq!(
            transition(MovementAction::Entry, VisitorStatus::Registered)
                .unwrap()
                .0,
            VisitorStatus::Entered
        );
        // 离场后允许重新入场
        assert_eq!(
            transition(MovementAction::Entry, VisitorStatus::Exited)
                .unwrap()
                .0,
            VisitorStatus::Entered
        );
        assert_eq!(
            transition(MovementAction::Entry, VisitorStatus::Entered).unwrap_err(),
            ErrorCode::VisitorAlreadyInside
        );
    }

    #[test]
    fn test_exit_transitions() {
        assert_eq!(
            transition(MovementAction::Exit, VisitorStatus::Entered)
                .unwrap()
                .0,
            VisitorStatus::Exited
        );
        assert_eq!(
            transition(MovementAction::Exit, VisitorStatus::Registered).unwrap_err(),
            ErrorCode::VisitorNotEntered
        );
        assert_eq!(
            transition(MovementAction::Exit, VisitorStatus::Exited).unwrap_err(),
            ErrorCode::VisitorAlreadyExited
        );
    }
}
