//! # Quantity Module
//!
//! Fixed-point ingredient quantities (kilograms of beans, litres of milk).
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Same idea as Money, one level finer                                    │
//! │                                                                         │
//! │  Wire / API        "0.018"            rust_decimal::Decimal             │
//! │       │                                                                 │
//! │       ▼  from_decimal (≤ 6 fractional digits)                           │
//! │  Quantity(18_000)  micro-units        i64, exact add / mul              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite INTEGER    18000                                                │
//! │                                                                         │
//! │  100 kg − 2 × 0.018 kg = 99.964 kg, with no float drift.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional decimal digits a quantity can carry.
pub const QUANTITY_SCALE: u32 = 6;

pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// A signed ingredient quantity in micro-units of the ingredient's unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Quantity(i64);

impl Quantity {
    /// Wraps a raw micro-unit count.
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Quantity(micros)
    }

    /// Whole units, `None` on overflow.
    #[inline]
    pub const fn from_units(units: i64) -> Option<Self> {
        match units.checked_mul(MICROS_PER_UNIT) {
            Some(v) => Some(Quantity(v)),
            None => None,
        }
    }

    /// Converts a decimal, rejecting more than six fractional digits.
    ///
    /// ## Example
    /// ```rust
    /// use brewline_core::quantity::Quantity;
    /// use rust_decimal::Decimal;
    ///
    /// let q = Quantity::from_decimal(Decimal::new(18, 3)).unwrap(); // 0.018
    /// assert_eq!(q.micros(), 18_000);
    ///
    /// assert!(Quantity::from_decimal(Decimal::new(1, 7)).is_err());
    /// ```
    pub fn from_decimal(value: Decimal) -> Result<Self, ValidationError> {
        let value = value.normalize();
        if value.scale() > QUANTITY_SCALE {
            return Err(ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: format!("at most {} decimal places", QUANTITY_SCALE),
            });
        }

        value
            .checked_mul(Decimal::from(MICROS_PER_UNIT))
            .and_then(|micros| micros.to_i64())
            .filter(|&micros| micros != i64::MIN)
            .map(Quantity)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "value is out of range".to_string(),
            })
    }

    /// Returns the raw micro-unit count.
    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    /// Exact decimal value, trailing zeros removed.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_SCALE).normalize()
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn checked_add(&self, other: Quantity) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Quantity(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Quantity) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Quantity(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_neg(&self) -> Option<Self> {
        match self.0.checked_neg() {
            Some(v) => Some(Quantity(v)),
            None => None,
        }
    }

    /// True when `-units <= self <= units` (whole units).
    pub fn within_units(&self, units: i64) -> bool {
        let limit = units.saturating_mul(MICROS_PER_UNIT);
        (-limit..=limit).contains(&self.0)
    }

    /// Scales by an integer factor (order line quantity).
    #[inline]
    pub const fn checked_mul(&self, factor: i64) -> Option<Self> {
        match self.0.checked_mul(factor) {
            Some(v) => Some(Quantity(v)),
            None => None,
        }
    }

    /// Half of this quantity, rounded toward zero.
    #[inline]
    pub const fn half(&self) -> Self {
        Quantity(self.0 / 2)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(-self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!("'{}' is not a decimal number", s),
        })?;
        Quantity::from_decimal(value)
    }
}

// =============================================================================
// Serde
// =============================================================================
// Serialized as a decimal string ("99.964"); accepts strings and JSON numbers.

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.to_decimal())
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal quantity as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        Quantity::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        Quantity::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
        if !v.is_finite() {
            return Err(E::custom("quantity must be finite"));
        }
        // Display gives the shortest round-tripping form ("0.018"), never an exponent
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(q("0.018").micros(), 18_000);
        assert_eq!(q("100").to_string(), "100");
        assert_eq!(q("99.964").to_string(), "99.964");
        assert_eq!(q("-0.036").to_string(), "-0.036");
        assert_eq!(q("1.500000").to_string(), "1.5");
    }

    #[test]
    fn test_rejects_excess_precision_and_garbage() {
        assert!("0.0000001".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
        // trailing zeros beyond the scale are fine
        assert_eq!(q("0.01800000000").micros(), 18_000);
    }

    #[test]
    fn test_espresso_arithmetic_is_exact() {
        let stock = q("100");
        let change = -q("0.018").checked_mul(2).unwrap();
        assert_eq!(change.to_string(), "-0.036");
        assert_eq!(stock.checked_add(change).unwrap().to_string(), "99.964");
    }

    #[test]
    fn test_checked_overflow() {
        assert!(Quantity::from_micros(i64::MAX).checked_mul(2).is_none());
        assert!(Quantity::from_units(i64::MAX).is_none());
        assert!(Quantity::from_micros(i64::MAX)
            .checked_add(Quantity::from_micros(1))
            .is_none());
    }

    #[test]
    fn test_most_negative_value_is_unrepresentable() {
        assert!("-9223372036854.775808".parse::<Quantity>().is_err());
        assert!("-9223372036854.775807".parse::<Quantity>().is_ok());
        assert!(Quantity::from_micros(i64::MIN).checked_neg().is_none());
        assert_eq!(q("0.036").checked_neg(), Some(q("-0.036")));
    }

    #[test]
    fn test_within_units() {
        assert!(q("5").within_units(5));
        assert!(q("-5").within_units(5));
        assert!(!q("5.000001").within_units(5));
        assert!(!Quantity::from_micros(i64::MIN).within_units(i64::MAX));
    }

    #[test]
    fn test_half() {
        assert_eq!(q("10").half(), q("5"));
        assert_eq!(Quantity::from_micros(3).half().micros(), 1);
    }

    #[test]
    fn test_serde_string_and_number() {
        assert_eq!(serde_json::to_string(&q("99.964")).unwrap(), "\"99.964\"");
        let from_str: Quantity = serde_json::from_str("\"0.018\"").unwrap();
        let from_num: Quantity = serde_json::from_str("0.018").unwrap();
        let from_int: Quantity = serde_json::from_str("100").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_int, q("100"));
        assert!(serde_json::from_str::<Quantity>("\"1e\"").is_err());
    }
}
