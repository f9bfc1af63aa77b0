//! # Inventory Deduction Planning
//!
//! Expands priced order lines through their recipes into per-ingredient
//! stock changes, and decides whether a change is admissible.
//!
//! ```text
//! 2 × Espresso (0.018 kg Coffee Beans)
//! 1 × Americano (0.018 kg Coffee Beans, 0.25 L Water)
//!      │
//!      ▼  plan_deductions
//! Coffee Beans  -0.054
//! Water         -0.25
//! ```
//!
//! Deductions come out sorted by ingredient id so every transaction touches
//! inventory rows in the same order.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::pricing::{PricedLine, ResolvedMenuItem};
use crate::quantity::Quantity;

/// Net stock change for one ingredient caused by one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub unit: String,
    /// Always negative for a sale.
    pub quantity_change: Quantity,
}

/// Builds the deduction plan for already priced lines.
///
/// Items without recipe lines deduct nothing. Lines whose item is missing
/// from `catalog` are skipped; pricing has already rejected them.
pub fn plan_deductions(
    lines: &[PricedLine],
    catalog: &HashMap<String, ResolvedMenuItem>,
) -> CoreResult<Vec<Deduction>> {
    let mut totals: BTreeMap<String, Deduction> = BTreeMap::new();

    for line in lines {
        let Some(resolved) = catalog.get(&line.menu_item_id) else {
            continue;
        };

        for recipe in &resolved.recipe {
            let used = recipe
                .quantity_required
                .checked_mul(line.quantity)
                .ok_or(CoreError::Overflow("ingredient usage"))?;

            let entry = totals
                .entry(recipe.ingredient_id.clone())
                .or_insert_with(|| Deduction {
                    ingredient_id: recipe.ingredient_id.clone(),
                    ingredient_name: recipe.ingredient_name.clone(),
                    unit: recipe.unit.clone(),
                    quantity_change: Quantity::zero(),
                });

            entry.quantity_change = entry
                .quantity_change
                .checked_sub(used)
                .ok_or(CoreError::Overflow("ingredient usage"))?;
        }
    }

    Ok(totals
        .into_values()
        .filter(|d| !d.quantity_change.is_zero())
        .collect())
}

// =============================================================================
// Stock Policy
// =============================================================================

/// Whether stock may go below zero.
///
/// Franchise default is `true`: a sale is never blocked on a stale count,
/// and the negative level shows up in low-stock alerts instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPolicy {
    pub allow_negative_stock: bool,
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy {
            allow_negative_stock: true,
        }
    }
}

impl StockPolicy {
    /// Strict policy: decreases may not go below zero.
    pub const fn strict() -> Self {
        StockPolicy {
            allow_negative_stock: false,
        }
    }

    /// Applies `change` to `before` and returns the new level.
    ///
    /// Increases are always admitted, even onto a negative level.
    pub fn apply(&self, ingredient: &str, before: Quantity, change: Quantity) -> CoreResult<Quantity> {
        let after = before
            .checked_add(change)
            .ok_or(CoreError::Overflow("stock level"))?;

        if !self.allow_negative_stock && change.is_negative() && after.is_negative() {
            return Err(CoreError::InsufficientStock {
                ingredient: ingredient.to_string(),
                available: before,
                requested: change
                    .checked_neg()
                    .ok_or(CoreError::Overflow("requested quantity"))?,
            });
        }

        Ok(after)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::tests::{catalog, menu_item};
    use crate::pricing::{price_cart, CartLine};
    use crate::types::RecipeLine;
    use chrono::Utc;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn recipe(item: &str, ingredient: &str, name: &str, qty: &str, unit: &str) -> RecipeLine {
        RecipeLine {
            id: format!("{}-{}", item, ingredient),
            menu_item_id: item.to_string(),
            ingredient_id: ingredient.to_string(),
            ingredient_name: name.to_string(),
            quantity_required: q(qty),
            unit: unit.to_string(),
            created_at: Utc::now(),
        }
    }

    fn coffee_catalog() -> HashMap<String, ResolvedMenuItem> {
        catalog(vec![
            ResolvedMenuItem {
                item: menu_item("menu-espresso", "Espresso", 350, true),
                recipe: vec![recipe("menu-espresso", "ing-beans", "Coffee Beans", "0.018", "kg")],
            },
            ResolvedMenuItem {
                item: menu_item("menu-americano", "Americano", 400, true),
                recipe: vec![
                    recipe("menu-americano", "ing-beans", "Coffee Beans", "0.018", "kg"),
                    recipe("menu-americano", "ing-water", "Water", "0.25", "L"),
                ],
            },
            ResolvedMenuItem {
                item: menu_item("menu-cookie", "Cookie", 200, true),
                recipe: vec![],
            },
        ])
    }

    fn plan(lines: &[CartLine]) -> Vec<Deduction> {
        let catalog = coffee_catalog();
        let priced = price_cart(lines, &catalog).unwrap();
        plan_deductions(&priced.lines, &catalog).unwrap()
    }

    #[test]
    fn test_two_espressos() {
        let deductions = plan(&[CartLine::new("menu-espresso", 2)]);
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].ingredient_id, "ing-beans");
        assert_eq!(deductions[0].quantity_change, q("-0.036"));
        assert_eq!(deductions[0].unit, "kg");
    }

    #[test]
    fn test_shared_ingredient_is_netted() {
        let deductions = plan(&[
            CartLine::new("menu-espresso", 2),
            CartLine::new("menu-americano", 1),
        ]);
        assert_eq!(deductions.len(), 2);
        assert_eq!(deductions[0].ingredient_id, "ing-beans");
        assert_eq!(deductions[0].quantity_change, q("-0.054"));
        assert_eq!(deductions[1].ingredient_id, "ing-water");
        assert_eq!(deductions[1].quantity_change, q("-0.25"));
    }

    #[test]
    fn test_item_without_recipe_deducts_nothing() {
        assert!(plan(&[CartLine::new("menu-cookie", 3)]).is_empty());
    }

    #[test]
    fn test_permissive_policy_allows_negative() {
        let after = StockPolicy::default()
            .apply("Coffee Beans", q("0.01"), q("-0.036"))
            .unwrap();
        assert_eq!(after, q("-0.026"));
    }

    #[test]
    fn test_strict_policy_rejects_shortfall() {
        let err = StockPolicy::strict()
            .apply("Coffee Beans", q("0.01"), q("-0.036"))
            .unwrap_err();
        match err {
            CoreError::InsufficientStock {
                ingredient,
                available,
                requested,
            } => {
                assert_eq!(ingredient, "Coffee Beans");
                assert_eq!(available, q("0.01"));
                assert_eq!(requested, q("0.036"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_policy_reports_unnegatable_change() {
        let result = StockPolicy::strict().apply(
            "Sugar",
            Quantity::zero(),
            Quantity::from_micros(i64::MIN),
        );
        assert!(matches!(result, Err(CoreError::Overflow(_))));
    }

    #[test]
    fn test_strict_policy_admits_exact_and_restock() {
        let policy = StockPolicy::strict();
        assert_eq!(policy.apply("Milk", q("1"), q("-1")).unwrap(), Quantity::zero());
        // a restock onto an already negative level is fine
        assert_eq!(policy.apply("Milk", q("-2"), q("1")).unwrap(), q("-1"));
    }
}
