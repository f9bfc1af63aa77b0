//! # Input Rules
//!
//! Range and format checks shared by checkout and catalog administration.
//!
//! ```text
//! JSON body ──serde──► request struct ──this module──► repository ──► SQLite
//!   (types)              (missing fields)   (ranges, formats)         (UNIQUE, FK)
//! ```
//!
//! Every check returns the field name in its error so the HTTP layer can
//! answer 400 with a message the till can show.

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::{
    MAX_CART_ITEMS, MAX_IDEMPOTENCY_KEY_LEN, MAX_ITEM_QUANTITY, MAX_STOCK_CHANGE_UNITS,
    MAX_STOCK_LEVEL_UNITS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded free-text field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use brewline_core::validation::validate_required_text;
///
/// assert_eq!(validate_required_text("name", "  Latte ", 100).unwrap(), "Latte");
/// assert!(validate_required_text("name", "   ", 100).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a menu item or ingredient name.
pub fn validate_name(name: &str) -> ValidationResult<String> {
    validate_required_text("name", name, 200)
}

/// Validates a menu category slug such as "hot-drinks".
pub fn validate_category(category: &str) -> ValidationResult<String> {
    validate_required_text("category", category, 100)
}

/// Validates a unit of measure such as "kg".
pub fn validate_unit(unit: &str) -> ValidationResult<String> {
    validate_required_text("unit", unit, 20)
}

/// Validates an entity id. Seeded catalog rows use readable ids
/// ("menu-espresso"), so any non-empty token is accepted.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<String> {
    let id = validate_required_text(field, id, 64)?;

    if id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(id)
}

/// Validates a client idempotency key.
pub fn validate_idempotency_key(key: &str) -> ValidationResult<String> {
    validate_required_text("idempotencyKey", key, MAX_IDEMPOTENCY_KEY_LEN)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ```text
/// validate_quantity(2)     → OK
/// validate_quantity(0)     → "quantity must be positive"
/// validate_quantity(1000)  → "quantity must be between 1 and 999"
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of lines in an order (the empty case is
/// reported separately as `CoreError::EmptyCart`).
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (staff drinks).
///
/// ```rust
/// use brewline_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(350).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_non_negative_cents("price", cents)
}

/// Validates a cash amount (opening or closing float).
pub fn validate_cash_cents(field: &str, cents: i64) -> ValidationResult<()> {
    validate_non_negative_cents(field, cents)
}

fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates an explicitly supplied order number.
pub fn validate_order_number(number: i64) -> ValidationResult<()> {
    if number < 1 {
        return Err(ValidationError::MustBePositive {
            field: "orderNumber".to_string(),
        });
    }

    Ok(())
}

/// Validates a recipe line quantity.
pub fn validate_recipe_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantityRequired".to_string(),
        });
    }
    within("quantityRequired", qty, MAX_STOCK_CHANGE_UNITS)
}

/// Validates a stock level that may not go below zero (thresholds, initial stock).
pub fn validate_non_negative_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if qty.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_stock_level(field, qty)
}

/// Validates a level a stock row may hold, in either direction.
pub fn validate_stock_level(field: &str, qty: Quantity) -> ValidationResult<()> {
    within(field, qty, MAX_STOCK_LEVEL_UNITS)
}

/// Validates a manual stock movement; zero moves nothing and is rejected.
pub fn validate_stock_change(qty: Quantity) -> ValidationResult<()> {
    if qty.is_zero() {
        return Err(ValidationError::InvalidFormat {
            field: "quantityChange".to_string(),
            reason: "must not be zero".to_string(),
        });
    }
    within("quantityChange", qty, MAX_STOCK_CHANGE_UNITS)
}

fn within(field: &str, qty: Quantity, units: i64) -> ValidationResult<()> {
    if !qty.within_units(units) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -units,
            max: units,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
