//! # Records
//!
//! Rows and enums shared by the database layer and the HTTP API.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Catalog (global)         Per-branch state           Audit              │
//! │  ─────────────────        ─────────────────          ─────              │
//! │  MenuItem ──┐             BranchInventory            InventoryTransaction│
//! │             │ RecipeLine  (branch, ingredient)       (append-only)      │
//! │  Ingredient ┘             current_stock                                 │
//! │                                                                         │
//! │  Sales                                                                  │
//! │  ─────                                                                  │
//! │  Order ──► OrderItem (snapshot: name, unit price, recipe version)       │
//! │    │                                                                    │
//! │    └──► Shift (cashier's open shift at checkout)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row structs derive `sqlx::FromRow` behind the `sqlx` feature; column names
//! match field names. Quantities are stored as integer micro-units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Tax Rate
// =============================================================================

/// Per-item tax in hundredths of a percent; the 14% default is `1400`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    BranchManager,
    Cashier,
}

impl Role {
    /// Only cashiers are bound to shifts at checkout.
    pub fn requires_shift(&self) -> bool {
        matches!(self, Role::Cashier)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::BranchManager => "BRANCH_MANAGER",
            Role::Cashier => "CASHIER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "BRANCH_MANAGER" => Ok(Role::BranchManager),
            "CASHIER" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![
                    "ADMIN".to_string(),
                    "BRANCH_MANAGER".to_string(),
                    "CASHIER".to_string(),
                ],
            }),
        }
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentMethod".to_string(),
                allowed: vec!["cash".to_string(), "card".to_string()],
            }),
        }
    }
}

/// Kind of stock movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryTransactionType {
    /// Consumption by an order.
    Sale,
    /// Delivery received.
    Restock,
    /// Count correction, either sign.
    Adjustment,
    /// Spoilage or spillage.
    Waste,
}

/// Stock level relative to an ingredient's reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Ok,
    Low,
    Critical,
    Out,
}

impl StockStatus {
    /// Classifies a level.
    ///
    /// ```text
    ///  stock <= 0                 → Out
    ///  stock <= threshold / 2     → Critical
    ///  stock <= threshold         → Low
    ///  otherwise                  → Ok
    /// ```
    pub fn classify(current: Quantity, reorder_threshold: Quantity) -> Self {
        if !current.is_positive() {
            StockStatus::Out
        } else if current <= reorder_threshold.half() {
            StockStatus::Critical
        } else if current <= reorder_threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    /// Whether this level should raise a low-stock alert.
    pub fn needs_attention(&self) -> bool {
        !matches!(self, StockStatus::Ok)
    }
}

/// Shift listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Closed,
}

// =============================================================================
// Organization
// =============================================================================

/// A physical store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A staff account. The password hash never leaves brewline-db.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    /// Home branch; `None` for franchise-wide admins.
    pub branch_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable menu item. Global across branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
    pub is_active: bool,
    pub sort_order: Option<i64>,
    /// Bumped whenever a recipe line is added or removed.
    pub recipe_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

/// A raw material tracked in branch inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    /// Unit of measure, e.g. "kg", "L", "pcs".
    pub unit: String,
    pub cost_per_unit_cents: i64,
    pub reorder_threshold: Quantity,
    pub created_at: DateTime<Utc>,
}

/// How much of one ingredient one unit of a menu item consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub id: String,
    pub menu_item_id: String,
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub quantity_required: Quantity,
    /// Copied from the ingredient when the line was created.
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Current stock of one ingredient at one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BranchInventory {
    pub id: String,
    pub branch_id: String,
    pub ingredient_id: String,
    /// May be negative when the stock policy allows it.
    pub current_stock: Quantity,
    pub last_updated: DateTime<Utc>,
}

/// One immutable ledger entry.
///
/// `stock_after = stock_before + quantity_change` always holds, and the
/// entries of a (branch, ingredient) pair ordered by `sequence` chain
/// from zero to the current stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: String,
    pub sequence: i64,
    pub branch_id: String,
    pub ingredient_id: String,
    pub transaction_type: InventoryTransactionType,
    pub quantity_change: Quantity,
    pub stock_before: Quantity,
    pub stock_after: Quantity,
    pub order_id: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    /// Whether this entry's own arithmetic is consistent.
    pub fn is_balanced(&self) -> bool {
        self.stock_before.checked_add(self.quantity_change) == Some(self.stock_after)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A completed sale at a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub branch_id: String,
    /// Unique and increasing per branch.
    pub order_number: i64,
    pub timestamp: DateTime<Utc>,
    pub cashier_id: String,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub transaction_hash: String,
    pub synced: bool,
    pub shift_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An order line. Name, unit price and recipe version are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
    pub recipe_version: i64,
}

// =============================================================================
// Shifts
// =============================================================================

/// A cashier's working session at one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub branch_id: String,
    pub cashier_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub opening_cash_cents: i64,
    pub closing_cash_cents: Option<i64>,
    /// Branch order count when the shift opened.
    pub opening_orders: i64,
    /// Branch revenue when the shift opened.
    pub opening_revenue_cents: i64,
    /// Orders attributed to this shift, fixed at close.
    pub closing_orders: Option<i64>,
    pub closing_revenue_cents: Option<i64>,
    pub is_closed: bool,
    pub notes: Option<String>,
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
    fn test_default_tax_rate_is_fourteen_percent() {
        assert_eq!(TaxRate::default().bps(), 1400);
    }

    #[test]
    fn test_only_cashiers_need_shifts() {
        assert!(Role::Cashier.requires_shift());
        assert!(!Role::Admin.requires_shift());
        assert!(!Role::BranchManager.requires_shift());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&Role::BranchManager).unwrap(),
            "\"BRANCH_MANAGER\""
        );
        assert_eq!("CASHIER".parse::<Role>().unwrap(), Role::Cashier);
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_stock_status_classification() {
        let threshold = q("10");
        assert_eq!(StockStatus::classify(q("0"), threshold), StockStatus::Out);
        assert_eq!(StockStatus::classify(q("-1"), threshold), StockStatus::Out);
        assert_eq!(StockStatus::classify(q("5"), threshold), StockStatus::Critical);
        assert_eq!(StockStatus::classify(q("7.5"), threshold), StockStatus::Low);
        assert_eq!(StockStatus::classify(q("10"), threshold), StockStatus::Low);
        assert_eq!(StockStatus::classify(q("99.964"), threshold), StockStatus::Ok);
        assert!(!StockStatus::Ok.needs_attention());
        assert!(StockStatus::Low.needs_attention());
    }

    #[test]
    fn test_ledger_entry_balance() {
        let entry = InventoryTransaction {
            id: "t1".to_string(),
            sequence: 1,
            branch_id: "b".to_string(),
            ingredient_id: "i".to_string(),
            transaction_type: InventoryTransactionType::Sale,
            quantity_change: q("-0.036"),
            stock_before: q("100"),
            stock_after: q("99.964"),
            order_id: Some("o".to_string()),
            created_by: "u".to_string(),
            notes: None,
            created_at: Utc::now(),
        };
        assert!(entry.is_balanced());

        let broken = InventoryTransaction {
            stock_after: q("99.96"),
            ..entry
        };
        assert!(!broken.is_balanced());
    }
}
