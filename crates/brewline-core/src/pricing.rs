//! # Order Pricing
//!
//! Turns a cart into priced order lines using catalog prices only.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        price_cart()                                     │
//! │                                                                         │
//! │  [CartLine { menu_item_id, quantity }]                                  │
//! │       │                                                                 │
//! │       ├── empty?                       → EmptyCart                      │
//! │       ├── quantity outside 1..=999?    → Validation                     │
//! │       ├── id not in catalog?           → MenuItemNotFound(id)           │
//! │       ├── item inactive?               → MenuItemInactive { name }      │
//! │       │                                                                 │
//! │       ▼   (every line checked before anything is returned)              │
//! │  PricedLine { unit_price = catalog price, subtotal = price × qty,       │
//! │               name + recipe_version snapshot }                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricedCart { subtotal = Σ line subtotals, total = subtotal }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax rates are carried on each line for reporting but are not added to
//! the total: menu prices are tax-inclusive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{MenuItem, RecipeLine, TaxRate};
use crate::validation::{validate_cart_size, validate_quantity};

// =============================================================================
// Inputs
// =============================================================================

/// One requested line of an order. Prices sent by clients are never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub menu_item_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(menu_item_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            menu_item_id: menu_item_id.into(),
            quantity,
        }
    }
}

/// A menu item together with its current recipe, as read from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMenuItem {
    #[serde(flatten)]
    pub item: MenuItem,
    pub recipe: Vec<RecipeLine>,
}

// =============================================================================
// Outputs
// =============================================================================

/// A validated, priced order line ready to be written as an order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    pub quantity: i64,
    pub subtotal: Money,
    pub recipe_version: i64,
}

/// A fully priced order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub total: Money,
}

impl PricedCart {
    /// Tax contained in the total, summed per line.
    pub fn tax(&self) -> Money {
        self.lines
            .iter()
            .map(|line| line.subtotal.calculate_tax(line.tax_rate))
            .sum()
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices `lines` against `catalog`.
///
/// ## Arguments
/// * `lines` - Requested order lines
/// * `catalog` - Resolved menu items keyed by id; ids absent from the map
///   are treated as unknown
///
/// ## Returns
/// The priced cart, or the first failing line's error. Nothing is partially
/// returned.
///
/// ## Example
/// ```rust,ignore
/// let priced = price_cart(&[CartLine::new("menu-espresso", 2)], &catalog)?;
/// assert_eq!(priced.total.cents(), 700);
/// ```
pub fn price_cart(
    lines: &[CartLine],
    catalog: &HashMap<String, ResolvedMenuItem>,
) -> CoreResult<PricedCart> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_cart_size(lines.len())?;

    for line in lines {
        validate_quantity(line.quantity)?;
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();

    for line in lines {
        let resolved = catalog
            .get(&line.menu_item_id)
            .ok_or_else(|| CoreError::MenuItemNotFound(line.menu_item_id.clone()))?;
        let item = &resolved.item;

        if !item.is_active {
            return Err(CoreError::MenuItemInactive {
                name: item.name.clone(),
            });
        }

        let line_subtotal = item
            .price()
            .checked_multiply_quantity(line.quantity)
            .ok_or(CoreError::Overflow("line subtotal"))?;
        subtotal = subtotal
            .checked_add(line_subtotal)
            .ok_or(CoreError::Overflow("order subtotal"))?;

        priced.push(PricedLine {
            menu_item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price(),
            tax_rate: item.tax_rate(),
            quantity: line.quantity,
            subtotal: line_subtotal,
            recipe_version: item.recipe_version,
        });
    }

    Ok(PricedCart {
        lines: priced,
        subtotal,
        total: subtotal,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn menu_item(id: &str, name: &str, price_cents: i64, active: bool) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            name: name.to_string(),
            category: "hot-drinks".to_string(),
            price_cents,
            tax_rate_bps: 1400,
            is_active: active,
            sort_order: None,
            recipe_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn catalog(items: Vec<ResolvedMenuItem>) -> HashMap<String, ResolvedMenuItem> {
        items
            .into_iter()
            .map(|r| (r.item.id.clone(), r))
            .collect()
    }

    fn coffee_catalog() -> HashMap<String, ResolvedMenuItem> {
        catalog(vec![
            ResolvedMenuItem {
                item: menu_item("menu-espresso", "Espresso", 350, true),
                recipe: vec![],
            },
            ResolvedMenuItem {
                item: menu_item("menu-americano", "Americano", 400, true),
                recipe: vec![],
            },
            ResolvedMenuItem {
                item: menu_item("menu-mocha", "Mocha", 500, false),
                recipe: vec![],
            },
        ])
    }

    #[test]
    fn test_prices_from_catalog() {
        let priced = price_cart(
            &[
                CartLine::new("menu-espresso", 2),
                CartLine::new("menu-americano", 1),
            ],
            &coffee_catalog(),
        )
        .unwrap();

        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.lines[0].unit_price.cents(), 350);
        assert_eq!(priced.lines[0].subtotal.cents(), 700);
        assert_eq!(priced.lines[0].name, "Espresso");
        assert_eq!(priced.lines[0].recipe_version, 1);
        assert_eq!(priced.subtotal.cents(), 1100);
        assert_eq!(priced.total, priced.subtotal);
    }

    #[test]
    fn test_empty_cart() {
        let err = price_cart(&[], &coffee_catalog()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_unknown_item() {
        let err = price_cart(&[CartLine::new("menu-latte", 1)], &coffee_catalog()).unwrap_err();
        assert_eq!(err.to_string(), "Menu item not found: menu-latte");
    }

    #[test]
    fn test_inactive_item_fails_even_after_valid_lines() {
        let err = price_cart(
            &[
                CartLine::new("menu-espresso", 1),
                CartLine::new("menu-mocha", 1),
            ],
            &coffee_catalog(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Menu item Mocha is not available");
    }

    #[test]
    fn test_bad_quantity_is_rejected_before_lookup() {
        let err = price_cart(
            &[
                CartLine::new("menu-latte", 1),
                CartLine::new("menu-espresso", 0),
            ],
            &coffee_catalog(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_tax_is_informational() {
        let priced =
            price_cart(&[CartLine::new("menu-espresso", 2)], &coffee_catalog()).unwrap();
        // 14% of 700 = 98, but the total is unchanged
        assert_eq!(priced.tax().cents(), 98);
        assert_eq!(priced.total.cents(), 700);
    }
}
