//! Unified error codes for the Feria backend
//!
//! This module defines all error codes used across the server and frontend.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Visitor errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1005,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,

    // ==================== 3xxx: Visitor ====================
    /// Visitor not found
    VisitorNotFound = 3001,
    /// Badge (QR data) not found
    BadgeNotFound = 3002,
    /// Badge has been deactivated
    BadgeDeactivated = 3003,
    /// Visitor is already inside
    VisitorAlreadyInside = 3004,
    /// Visitor has not entered yet
    VisitorNotEntered = 3005,
    /// Visitor has already exited
    VisitorAlreadyExited = 3006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order payment has already been validated
    OrderAlreadyValidated = 4002,
    /// Order has no items
    EmptyOrder = 4003,
    /// Claimed total does not match the server-computed total
    TotalMismatch = 4004,

    // ==================== 5xxx: Payment ====================
    /// Payment proof file is required
    PaymentProofRequired = 5001,
    /// Payment proof file type is not allowed
    PaymentProofInvalid = 5002,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is not available for ordering
    ProductNotAvailable = 6002,
    /// Requested quantity exceeds available stock
    InsufficientStock = 6003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// File storage error
    FileStorageError = 9003,
}

impl ErrorCode {
    /// Get the numeric value of this error code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",

            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid email or password",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::AccountDisabled => "Account has been disabled",

            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Admin role required",

            Self::VisitorNotFound => "Visitor not found",
            Self::BadgeNotFound => "QR code not found. Please register first.",
            Self::BadgeDeactivated => "QR code is deactivated",
            Self::VisitorAlreadyInside => "Visitor is already inside",
            Self::VisitorNotEntered => "Visitor has not entered yet",
            Self::VisitorAlreadyExited => "Visitor has already exited",

            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyValidated => "Order payment has already been validated",
            Self::EmptyOrder => "Items must be a non-empty array",
            Self::TotalMismatch => "Total amount mismatch",

            Self::PaymentProofRequired => "Payment proof file is required",
            Self::PaymentProofInvalid => "Only image files and PDF are allowed",

            Self::ProductNotFound => "Product not found",
            Self::ProductNotAvailable => "Product is not available",
            Self::InsufficientStock => "Insufficient stock",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::FileStorageError => "File storage error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::InvalidFormat,
            7 => Self::RequiredField,
            8 => Self::ValueOutOfRange,

            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,
            1003 => Self::TokenExpired,
            1004 => Self::TokenInvalid,
            1005 => Self::AccountDisabled,

            2001 => Self::PermissionDenied,
            2002 => Self::AdminRequired,

            3001 => Self::VisitorNotFound,
            3002 => Self::BadgeNotFound,
            3003 => Self::BadgeDeactivated,
            3004 => Self::VisitorAlreadyInside,
            3005 => Self::VisitorNotEntered,
            3006 => Self::VisitorAlreadyExited,

            4001 => Self::OrderNotFound,
            4002 => Self::OrderAlreadyValidated,
            4003 => Self::EmptyOrder,
            4004 => Self::TotalMismatch,

            5001 => Self::PaymentProofRequired,
            5002 => Self::PaymentProofInvalid,

            6001 => Self::ProductNotFound,
            6002 => Self::ProductNotAvailable,
            6003 => Self::InsufficientStock,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::FileStorageError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::VisitorNotFound.code(), 3001);
        assert_eq!(ErrorCode::TotalMismatch.code(), 4004);
        assert_eq!(ErrorCode::InsufficientStock.code(), 6003);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::BadgeDeactivated,
            ErrorCode::OrderAlreadyValidated,
            ErrorCode::ProductNotAvailable,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_unknown() {
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "6003");

        let code: ErrorCode = serde_json::from_str("4004").unwrap();
        assert_eq!(code, ErrorCode::TotalMismatch);
    }
}
