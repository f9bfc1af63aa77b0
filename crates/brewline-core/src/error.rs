//! # Domain Errors
//!
//! Failures the pure order logic can report. Nothing here has touched the
//! database yet, so callers can bail out without undoing anything.
//!
//! ```text
//! ValidationError ──► CoreError ──► CheckoutError (brewline-db)
//!                                        │
//!                                        ▼
//!                                   ApiError (server) ──► status + code
//! ```

use thiserror::Error;

use crate::quantity::Quantity;

/// A rule of the order flow was broken.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Order must contain at least one item")]
    EmptyCart,

    #[error("Order cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    #[error("Menu item {name} is not available")]
    MenuItemInactive { name: String },

    /// Only raised under a strict stock policy. The default lets stock go
    /// negative and records the movement.
    #[error("Insufficient stock for {ingredient}: available {available}, requested {requested}")]
    InsufficientStock {
        ingredient: String,
        available: Quantity,
        requested: Quantity,
    },

    #[error("No active shift found. Please open a shift first.")]
    NoOpenShift,

    /// Cashier's open shift was opened at another branch.
    #[error("Active shift is for a different branch")]
    ShiftBranchMismatch,

    #[error("Cashier already has an open shift: {shift_id}")]
    ShiftAlreadyOpen { shift_id: String },

    #[error("Shift {0} is already closed")]
    ShiftAlreadyClosed(String),

    /// Named value did not fit in an `i64`.
    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// A single request field is unusable. `field` uses the wire (camelCase) name.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_failures_name_the_item() {
        let missing = CoreError::MenuItemNotFound("menu-latte".into());
        assert_eq!(missing.to_string(), "Menu item not found: menu-latte");

        let inactive = CoreError::MenuItemInactive { name: "Mocha".into() };
        assert_eq!(inactive.to_string(), "Menu item Mocha is not available");
    }

    #[test]
    fn stock_shortfall_prints_decimal_quantities() {
        let err = CoreError::InsufficientStock {
            ingredient: "Coffee Beans".into(),
            available: Quantity::from_micros(10_000),
            requested: Quantity::from_micros(36_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Coffee Beans: available 0.01, requested 0.036"
        );
    }

    #[test]
    fn field_errors_lift_into_core_errors() {
        let err: CoreError = ValidationError::required("branchId").into();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "branchId"
        ));
        assert_eq!(err.to_string(), "branchId is required");
    }
}
