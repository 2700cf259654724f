//! WebSocket 实时事件流
//!
//! 仪表盘通过 `GET /api/events/ws?token=<jwt>` 订阅全部事件；
//! 访客状态页通过 `GET /api/events/ws?visitor_id=<id>` 只订阅自己的
//! 状态事件。转发任务跟随通知总线的关闭信号退出。

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use shared::message::{BusMessage, EventType};
use shared::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events/ws", get(ws_handler))
}

/// Subscription scope of one WebSocket session
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Authenticated admin dashboard: receives every event
    Admin,
    /// Visitor status page: receives only its own status events
    Visitor(i64),
}

fn allowed(scope: Scope, msg: &BusMessage) -> bool {
    match scope {
        Scope::Admin => true,
        Scope::Visitor(id) => {
            msg.event == EventType::VisitorStatus
                && msg.payload.get("visitor_id").and_then(|v| v.as_i64()) == Some(id)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
    pub visitor_id: Option<i64>,
}

async fn ws_handler(
    State(state): State<ServerState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    // 握手阶段确定订阅范围；两者都缺则拒绝
    let scope = if let Some(ref token) = query.token {
        state
            .jwt_service
            .validate_token(token)
            .map_err(|_| AppError::invalid_token("Invalid token"))?;
        Scope::Admin
    } else if let Some(visitor_id) = query.visitor_id {
        Scope::Visitor(visitor_id)
    } else {
        return Err(AppError::unauthorized());
    };

    Ok(ws.on_upgrade(move |socket| forward_events(socket, state, scope)))
}

/// 把总线事件转发到单个 WebSocket 会话
///
/// 落后 (Lagged) 的订阅者丢弃错过的消息继续；绝不反压发布方。
async fn forward_events(socket: WebSocket, state: ServerState, scope: Scope) {
    let mut events = state.notifier.subscribe();
    let shutdown = state.notifier.shutdown_token();
    let (mut sink, mut stream) = socket.split();

    tracing::debug!(?scope, "WebSocket subscriber connected");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            // 客户端侧：只关心断开
            incoming = stream.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    _ => continue,
                }
            }

            event = events.recv() => {
                match event {
                    Ok(msg) => {
                        if !allowed(scope, &msg) {
                            continue;
                        }
                        let Ok(json) = serde_json::to_string(&msg) else {
                            continue;
                        };
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "WebSocket subscriber lagged, dropping events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(?scope, "WebSocket subscriber disconnected");
}
