//! # API Errors
//!
//! Every failure leaves a handler as an [`ApiError`] and reaches the client
//! as `{ "success": false, "error", "code", "details"? }`.
//!
//! ## Status Mapping
//! ```text
//! 400  validation, empty cart, inactive item, no open shift,
//!      shift/branch mismatch, insufficient stock, malformed JSON
//! 401  bad credentials
//! 403  inactive account
//! 404  cashier, branch, menu item, shift, order, ingredient, recipe
//! 405  POST to a shift without the PATCH override
//! 409  duplicate order number, duplicate recipe line, shift already
//!      open or closed, menu item still on orders
//! 500  persistence failure (logged; `details` only where the route opts in)
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use brewline_core::{CoreError, ValidationError};
use brewline_db::{CheckoutError, DbError};

/// An error response.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
    }

    /// Converts a database error, and when it is a server failure replaces
    /// the message with `message` and echoes the reason in `details`.
    pub fn with_operator_details(err: DbError, message: &str) -> Self {
        let reason = err.to_string();
        let mut api = ApiError::from(err);
        if api.status.is_server_error() {
            api.message = message.to_string();
            api.details = Some(reason);
        }
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
            code: self.code,
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) | CoreError::CartTooLarge { .. } | CoreError::Overflow(_) => {
                ApiError::bad_request(message)
            }
            CoreError::EmptyCart => ApiError::new(StatusCode::BAD_REQUEST, "EMPTY_CART", message),
            CoreError::MenuItemNotFound(_) => ApiError::not_found(message),
            CoreError::MenuItemInactive { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "MENU_ITEM_INACTIVE", message)
            }
            CoreError::InsufficientStock { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
            }
            CoreError::NoOpenShift => {
                ApiError::new(StatusCode::BAD_REQUEST, "NO_OPEN_SHIFT", message)
            }
            CoreError::ShiftBranchMismatch => {
                ApiError::new(StatusCode::BAD_REQUEST, "SHIFT_BRANCH_MISMATCH", message)
            }
            CoreError::ShiftAlreadyOpen { .. } => {
                ApiError::new(StatusCode::CONFLICT, "SHIFT_ALREADY_OPEN", message)
            }
            CoreError::ShiftAlreadyClosed(_) => {
                ApiError::new(StatusCode::CONFLICT, "SHIFT_ALREADY_CLOSED", message)
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{} not found", entity)),
            DbError::UniqueViolation { .. } | DbError::Conflict(_) => {
                ApiError::conflict(err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_REFERENCE",
                "Referenced record does not exist",
            ),
            other => {
                error!(error = %other, "Database failure");
                ApiError::internal()
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::Validation(_) => ApiError::bad_request(message),
            CheckoutError::EmptyCart => {
                ApiError::new(StatusCode::BAD_REQUEST, "EMPTY_CART", message)
            }
            CheckoutError::CashierNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "CASHIER_NOT_FOUND", message)
            }
            CheckoutError::BranchNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "BRANCH_NOT_FOUND", message)
            }
            CheckoutError::MenuItemNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "MENU_ITEM_NOT_FOUND", message)
            }
            CheckoutError::MenuItemInactive { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "MENU_ITEM_INACTIVE", message)
            }
            CheckoutError::NoOpenShift => {
                ApiError::new(StatusCode::BAD_REQUEST, "NO_OPEN_SHIFT", message)
            }
            CheckoutError::ShiftBranchMismatch => {
                ApiError::new(StatusCode::BAD_REQUEST, "SHIFT_BRANCH_MISMATCH", message)
            }
            CheckoutError::InsufficientStock { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
            }
            CheckoutError::DuplicateOrderNumber { .. } => {
                ApiError::new(StatusCode::CONFLICT, "DUPLICATE_ORDER_NUMBER", message)
            }
            CheckoutError::Persistence(ref source) => {
                let details = source.to_string();
                error!(error = %details, "Order processing failed");
                ApiError {
                    details: Some(details),
                    ..ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "ORDER_FAILED", message)
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            format!("Invalid request body: {}", rejection.body_text()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_status_mapping() {
        let cases = [
            (CheckoutError::EmptyCart, StatusCode::BAD_REQUEST),
            (CheckoutError::NoOpenShift, StatusCode::BAD_REQUEST),
            (CheckoutError::ShiftBranchMismatch, StatusCode::BAD_REQUEST),
            (
                CheckoutError::CashierNotFound("u".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CheckoutError::MenuItemNotFound("m".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CheckoutError::DuplicateOrderNumber {
                    branch_id: "b".to_string(),
                    order_number: 7,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_persistence_failure_carries_details() {
        let api = ApiError::from(CheckoutError::Persistence(DbError::Busy));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Failed to process order");
        assert_eq!(api.details.as_deref(), Some("Database is busy"));
    }

    #[test]
    fn test_db_failures_hide_details_by_default() {
        let api = ApiError::from(DbError::QueryFailed("no such table: shifts".to_string()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.details, None);

        let api = ApiError::with_operator_details(
            DbError::QueryFailed("no such table: shifts".to_string()),
            "Failed to close shift",
        );
        assert_eq!(api.message, "Failed to close shift");
        assert!(api.details.unwrap().contains("no such table"));

        // Non-server errors are left as they are
        let api = ApiError::with_operator_details(DbError::not_found("Shift", "s1"), "x");
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "Shift not found");
    }
}
