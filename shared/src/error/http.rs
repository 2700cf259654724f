//! HTTP status mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // General: caller error
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::RequiredField
            | Self::ValueOutOfRange => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,

            // Auth
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::AccountDisabled => StatusCode::FORBIDDEN,

            // Permission
            Self::PermissionDenied | Self::AdminRequired => StatusCode::FORBIDDEN,

            // Visitor
            Self::VisitorNotFound | Self::BadgeNotFound => StatusCode::NOT_FOUND,
            Self::BadgeDeactivated => StatusCode::FORBIDDEN,
            Self::VisitorAlreadyInside
            | Self::VisitorNotEntered
            | Self::VisitorAlreadyExited => StatusCode::BAD_REQUEST,

            // Order
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::OrderAlreadyValidated | Self::EmptyOrder | Self::TotalMismatch => {
                StatusCode::BAD_REQUEST
            }

            // Payment
            Self::PaymentProofRequired | Self::PaymentProofInvalid => StatusCode::BAD_REQUEST,

            // Product
            Self::ProductNotFound => StatusCode::NOT_FOUND,
            Self::ProductNotAvailable | Self::InsufficientStock => StatusCode::BAD_REQUEST,

            // System
            Self::InternalError | Self::DatabaseError | Self::FileStorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::VisitorNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::BadgeDeactivated.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::InsufficientStock.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::TotalMismatch.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
