//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! The taxonomy follows three recoverable classes: validation errors block
//! progression until corrected; service errors (carrier, payment provider,
//! database) abandon the operation with prior state preserved; business-rule
//! rejections leave the requested mutation unapplied. Nothing here is fatal
//! to the process.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::cart::CartError;
use crate::services::auth::AuthError;
use crate::services::carrier::CarrierError;
use crate::services::cart::CartStoreError;
use crate::services::checkout::FinalizeRejection;
use crate::services::kv::KvError;
use crate::services::payment::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Carrier address-validation API failed.
    #[error("Carrier error: {0}")]
    Carrier(#[from] CarrierError),

    /// Payment provider API failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// A cart rule rejected the mutation.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Guest session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] KvError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A finalization for this payment session is already running.
    #[error("Finalize error: {0}")]
    Finalize(#[from] FinalizeRejection),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Semantically invalid input; correct and retry.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartStoreError> for AppError {
    fn from(err: CartStoreError) -> Self {
        match err {
            CartStoreError::Cart(e) => Self::Cart(e),
            CartStoreError::Kv(e) => Self::Session(e),
            CartStoreError::Repository(e) => Self::Database(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Carrier(_) | Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Cart(err) => match err {
                CartError::ZeroQuantity => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::UnknownVariant => StatusCode::NOT_FOUND,
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartError::Money(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AccountExists => StatusCode::CONFLICT,
                AuthError::WeakPassword | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Hashing => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Finalize(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal details never leave the server.
    fn message(&self) -> String {
        match self {
            Self::Database(err) => match err {
                RepositoryError::Conflict(msg) => msg.clone(),
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Carrier(_) => {
                "Address validation is temporarily unavailable, please try again".to_string()
            }
            Self::Payment(_) => {
                "Payment service is temporarily unavailable, please try again".to_string()
            }
            Self::Cart(err) => match err {
                CartError::Money(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::AccountExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::WeakPassword => err.to_string(),
                AuthError::Hashing => "Internal server error".to_string(),
            },
            Self::Finalize(err) => err.to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg)
            | Self::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry
        if matches!(
            self,
            Self::Database(_)
                | Self::Carrier(_)
                | Self::Payment(_)
                | Self::Session(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = Json(json!({ "error": self.message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product aurora-ring".to_string());
        assert_eq!(err.to_string(), "Not found: product aurora-ring");

        let err = AppError::Validation("missing required address field: city".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: missing required address field: city"
        );
    }

    #[test]
    fn test_status_codes_by_taxonomy() {
        // Validation errors block progression
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Cart(CartError::ZeroQuantity).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        // Business-rule rejections leave the mutation unapplied
        assert_eq!(
            AppError::Cart(CartError::InsufficientStock {
                requested: 5,
                available: 2
            })
            .status(),
            StatusCode::CONFLICT
        );

        // Duplicate finalization attempts conflict
        assert_eq!(
            AppError::Finalize(FinalizeRejection::InFlight).status(),
            StatusCode::CONFLICT
        );

        assert_eq!(
            AppError::Unauthorized("no token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = AppError::Internal("connection pool exhausted at 10.0.0.3".to_string());
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_stock_rejection_message_is_customer_facing() {
        let err = AppError::Cart(CartError::InsufficientStock {
            requested: 5,
            available: 2,
        });
        assert_eq!(err.message(), "insufficient stock: requested 5, available 2");
    }

    #[test]
    fn test_cart_store_error_flattens() {
        let err: AppError = CartStoreError::Cart(CartError::ZeroQuantity).into();
        assert!(matches!(err, AppError::Cart(CartError::ZeroQuantity)));
    }
}
