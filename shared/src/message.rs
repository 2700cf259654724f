//! 实时事件总线消息类型
//!
//! 服务端在事务提交之后发布 [`BusMessage`]，仪表盘通过 WebSocket 订阅。
//! 发布是 fire-and-forget：投递失败绝不影响业务事务的结果。

use serde::{Deserialize, Serialize};

use crate::models::{MovementAction, VisitorStatus};
use crate::util::now_millis;

/// Event type carried on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new order was committed
    OrderCreated,
    /// An order's payment was approved or rejected
    OrderValidated,
    /// A visitor passed a gate (admin dashboards)
    VisitorMovement,
    /// A visitor's own status changed (per-visitor channel)
    VisitorStatus,
}

/// Bus message envelope
///
/// `version` 由服务端按资源递增，客户端用它丢弃乱序到达的旧事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    /// Unique message id
    pub id: String,
    pub event: EventType,
    /// Resource the event belongs to ("order", "visitor", ...)
    pub resource: String,
    /// Monotonic per-resource version
    pub version: u64,
    /// Event payload (shape depends on `event`)
    pub payload: serde_json::Value,
    /// Publish timestamp (UTC millis)
    pub timestamp: i64,
}

impl BusMessage {
    /// Build a new envelope; payload serialization failures degrade to null
    pub fn new<T: Serialize>(
        event: EventType,
        resource: impl Into<String>,
        version: u64,
        payload: &T,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            resource: resource.into(),
            version,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            timestamp: now_millis(),
        }
    }
}

/// Payload for [`EventType::VisitorMovement`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementEvent {
    pub visitor_id: i64,
    pub visitor_name: String,
    pub booking_reference: String,
    pub action: MovementAction,
    pub status: VisitorStatus,
    pub timestamp: i64,
    pub gate_location: String,
    pub scanned_by: String,
}

/// Payload for [`EventType::VisitorStatus`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub visitor_id: i64,
    pub status: VisitorStatus,
    pub message: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_message_roundtrip() {
        let payload = StatusEvent {
            visitor_id: 42,
            status: VisitorStatus::Entered,
            message: "Welcome! Visitor has entered successfully.".to_string(),
            timestamp: now_millis(),
        };
        let msg = BusMessage::new(EventType::VisitorStatus, "visitor", 7, &payload);

        let json = serde_json::to_string(&msg).unwrap();
        let back: BusMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(back.event, EventType::VisitorStatus);
        assert_eq!(back.resource, "visitor");
        assert_eq!(back.version, 7);
        assert_eq!(back.payload["visitor_id"], 42);
        assert_eq!(back.payload["status"], "entered");
    }

    #[test]
    fn test_event_type_serialization() {
        assert_eq!(
            serde_json::to_string(&EventType::OrderCreated).unwrap(),
            "\"order_created\""
        );
        assert_eq!(
            serde_json::to_string(&EventType::VisitorMovement).unwrap(),
            "\"visitor_movement\""
        );
    }
}
