//! Visitor Model

use serde::{Deserialize, Serialize};

/// Visitor badge lifecycle state
///
/// `registered` → `entered` → `exited` (re-entry moves `exited` back to
/// `entered` and clears the exit timestamp)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum VisitorStatus {
    #[default]
    Registered,
    Entered,
    Exited,
}

/// Gate scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum MovementAction {
    Entry,
    Exit,
}

/// Visitor entity (QR badge holder)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Visitor {
    pub id: i64,
    /// Opaque badge token encoded into the printed QR code
    pub qr_data: String,
    pub visitor_name: String,
    pub booking_reference: String,
    pub guest_count: i64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub purpose: Option<String>,
    pub status: VisitorStatus,
    pub entry_time: Option<i64>,
    pub exit_time: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Register visitor payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorCreate {
    pub visitor_name: String,
    pub booking_reference: String,
    pub guest_count: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub purpose: Option<String>,
}

/// Badge activation update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorStatusUpdate {
    pub is_active: bool,
}

/// Gate scan request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub qr_data: String,
    pub action: MovementAction,
    pub gate_location: Option<String>,
    pub scanned_by: Option<String>,
}

/// Result of an accepted gate scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub visitor_id: i64,
    pub visitor_name: String,
    pub action: MovementAction,
    pub status: VisitorStatus,
    pub timestamp: i64,
    pub message: String,
}

/// Visitor movement entity (append-only gate audit log)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VisitorMovement {
    pub id: i64,
    pub visitor_id: i64,
    pub action: MovementAction,
    pub gate_location: String,
    pub scanned_by: String,
    pub timestamp: i64,
}

/// Movement joined with the visitor's display name (for list views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MovementWithVisitor {
    pub id: i64,
    pub visitor_id: i64,
    pub visitor_name: String,
    pub action: MovementAction,
    pub gate_location: String,
    pub scanned_by: String,
    pub timestamp: i64,
}
