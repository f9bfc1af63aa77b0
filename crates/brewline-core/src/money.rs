//! # Money
//!
//! Every price, subtotal and shift revenue figure is a whole number of cents.
//!
//! ```text
//! menu_items.price_cents ─► PricedLine.unit_price ─► PricedLine.subtotal
//!                                                          │ Σ
//!                                                          ▼
//!                    shifts.closing_revenue_cents ◄── orders.total_cents
//! ```
//!
//! On the wire a `Money` is the bare cent count (`"total": 700`), never a
//! float, so the revenue a shift reports equals the sum of its receipts.
//!
//! ```rust
//! use brewline_core::money::Money;
//!
//! let espresso = Money::from_cents(350);
//! let line = espresso.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line.cents(), 700);
//! assert_eq!(line.to_string(), "$7.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::types::TaxRate;

/// Signed cent amount. Negative values show up as cash shortfalls.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Unit price times a line quantity. `None` if the product leaves `i64`.
    ///
    /// ```rust
    /// use brewline_core::money::Money;
    ///
    /// let americano = Money::from_cents(400);
    /// assert_eq!(americano.checked_multiply_quantity(3), Some(Money::from_cents(1200)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Tax contained in this amount at `rate`, half-cents rounded up.
    ///
    /// Informational only: order totals are catalog price times quantity.
    ///
    /// ```rust
    /// use brewline_core::money::Money;
    /// use brewline_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(350).calculate_tax(TaxRate::from_bps(1400));
    /// assert_eq!(tax.cents(), 49);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let scaled = i128::from(self.0) * i128::from(rate.bps());
        Money::from_cents(((scaled + 5_000) / 10_000) as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}.{:02}", magnitude / 100, magnitude % 100)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}
