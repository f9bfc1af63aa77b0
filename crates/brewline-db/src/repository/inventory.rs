//! # Inventory Repository
//!
//! Branch stock levels and the append-only inventory ledger.
//!
//! ## Stock Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    apply_movement() (inside a transaction)              │
//! │                                                                         │
//! │  1. UPSERT branch_inventory                                            │
//! │     current_stock = current_stock + change  RETURNING current_stock     │
//! │       │   (one statement: concurrent writers can't lose an update)      │
//! │       ▼                                                                 │
//! │  2. before = after - change                                            │
//! │     StockPolicy::apply(before, change)  ──► InsufficientStock           │
//! │       │                                     (caller drops the tx)      │
//! │       ▼                                                                 │
//! │  3. INSERT inventory_transactions                                      │
//! │     (before, change, after) RETURNING sequence                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger rows are never updated or deleted (the schema enforces it), so the
//! entries of one (branch, ingredient) pair replay from zero to the current
//! stock. [`InventoryRepository::verify_ledger`] checks exactly that.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use brewline_core::quantity::MICROS_PER_UNIT;
use brewline_core::validation::{validate_stock_change, validate_stock_level};
use brewline_core::{
    CoreError, InventoryTransaction, InventoryTransactionType, Quantity, StockPolicy,
    StockStatus, ValidationError, MAX_STOCK_LEVEL_UNITS,
};

use super::now;
use crate::error::{DbError, DbResult};

const LEDGER_COLUMNS: &str = "id, sequence, branch_id, ingredient_id, transaction_type, \
     quantity_change, stock_before, stock_after, order_id, created_by, notes, created_at";

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// One stock change to apply and record.
#[derive(Debug, Clone, Copy)]
pub struct StockMovement<'a> {
    pub branch_id: &'a str,
    pub ingredient_id: &'a str,
    /// Used in the error when the stock policy rejects the change.
    pub ingredient_name: &'a str,
    pub quantity_change: Quantity,
    pub transaction_type: InventoryTransactionType,
    pub order_id: Option<&'a str>,
    pub created_by: &'a str,
    pub notes: Option<&'a str>,
}

/// A manual stock change (delivery, count correction, spoilage).
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub branch_id: String,
    pub ingredient_id: String,
    pub quantity_change: Quantity,
    pub transaction_type: InventoryTransactionType,
    pub created_by: String,
    pub notes: Option<String>,
}

/// Stock of one ingredient at a branch, with its alert status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub unit: String,
    pub current_stock: Quantity,
    pub reorder_threshold: Quantity,
    pub status: StockStatus,
    /// `None` when the branch never held this ingredient.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    ingredient_id: String,
    ingredient_name: String,
    unit: String,
    current_stock: Quantity,
    reorder_threshold: Quantity,
    last_updated: Option<DateTime<Utc>>,
}

impl From<StockRow> for StockLevel {
    fn from(row: StockRow) -> Self {
        StockLevel {
            status: StockStatus::classify(row.current_stock, row.reorder_threshold),
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            unit: row.unit,
            current_stock: row.current_stock,
            reorder_threshold: row.reorder_threshold,
            last_updated: row.last_updated,
        }
    }
}

/// Result of replaying one ledger chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerCheck {
    pub entries: usize,
    /// Every entry satisfies `after = before + change`.
    pub balanced: bool,
    /// The first entry starts at zero and each entry starts where the
    /// previous one ended.
    pub chained: bool,
    /// Sum of all changes.
    pub replayed_stock: Quantity,
    pub current_stock: Quantity,
    pub consistent: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for branch stock and the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Applies one movement on `conn` and appends its ledger entry.
    ///
    /// The stock row is written before the policy check, so this must run
    /// inside a transaction the caller rolls back on error.
    ///
    /// ## Returns
    /// * `Ok(InventoryTransaction)` - The appended ledger entry
    /// * `Err(DbError::Domain(InsufficientStock))` - Policy rejected the change
    pub async fn apply_movement(
        conn: &mut SqliteConnection,
        movement: &StockMovement<'_>,
        policy: StockPolicy,
    ) -> DbResult<InventoryTransaction> {
        validate_stock_level("quantityChange", movement.quantity_change)?;
        let timestamp = now();

        // The WHERE keeps the row untouched when the sum would leave the
        // allowed range; RETURNING then yields nothing.
        let stock_after: Quantity = sqlx::query_scalar(
            "INSERT INTO branch_inventory (id, branch_id, ingredient_id, current_stock, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(branch_id, ingredient_id) DO UPDATE SET
                 current_stock = current_stock + excluded.current_stock,
                 last_updated = excluded.last_updated
             WHERE current_stock + excluded.current_stock BETWEEN -?6 AND ?6
             RETURNING current_stock",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(movement.branch_id)
        .bind(movement.ingredient_id)
        .bind(movement.quantity_change)
        .bind(timestamp)
        .bind(MAX_STOCK_LEVEL_UNITS * MICROS_PER_UNIT)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "currentStock".to_string(),
            min: -MAX_STOCK_LEVEL_UNITS,
            max: MAX_STOCK_LEVEL_UNITS,
        })?;

        let stock_before = stock_after
            .checked_sub(movement.quantity_change)
            .ok_or(CoreError::Overflow("stock level"))?;
        policy.apply(movement.ingredient_name, stock_before, movement.quantity_change)?;

        let mut entry = InventoryTransaction {
            id: Uuid::new_v4().to_string(),
            sequence: 0,
            branch_id: movement.branch_id.to_string(),
            ingredient_id: movement.ingredient_id.to_string(),
            transaction_type: movement.transaction_type,
            quantity_change: movement.quantity_change,
            stock_before,
            stock_after,
            order_id: movement.order_id.map(str::to_string),
            created_by: movement.created_by.to_string(),
            notes: movement.notes.map(str::to_string),
            created_at: timestamp,
        };

        entry.sequence = sqlx::query_scalar(
            "INSERT INTO inventory_transactions
                (id, branch_id, ingredient_id, transaction_type, quantity_change,
                 stock_before, stock_after, order_id, created_by, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING sequence",
        )
        .bind(&entry.id)
        .bind(&entry.branch_id)
        .bind(&entry.ingredient_id)
        .bind(entry.transaction_type)
        .bind(entry.quantity_change)
        .bind(entry.stock_before)
        .bind(entry.stock_after)
        .bind(&entry.order_id)
        .bind(&entry.created_by)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .fetch_one(&mut *conn)
        .await?;

        debug!(
            branch_id = %entry.branch_id,
            ingredient_id = %entry.ingredient_id,
            change = %entry.quantity_change,
            stock_after = %entry.stock_after,
            sequence = entry.sequence,
            "Stock movement applied"
        );

        Ok(entry)
    }

    /// Records a manual stock change in its own transaction.
    ///
    /// ```text
    /// RESTOCK     change > 0
    /// WASTE       change < 0
    /// ADJUSTMENT  change != 0
    /// SALE        only through checkout
    /// ```
    pub async fn adjust(
        &self,
        adjustment: &StockAdjustment,
        policy: StockPolicy,
    ) -> DbResult<InventoryTransaction> {
        validate_stock_change(adjustment.quantity_change)?;
        match adjustment.transaction_type {
            InventoryTransactionType::Sale => {
                return Err(ValidationError::NotAllowed {
                    field: "transactionType".to_string(),
                    allowed: vec![
                        "RESTOCK".to_string(),
                        "ADJUSTMENT".to_string(),
                        "WASTE".to_string(),
                    ],
                }
                .into());
            }
            InventoryTransactionType::Restock if !adjustment.quantity_change.is_positive() => {
                return Err(ValidationError::MustBePositive {
                    field: "quantityChange".to_string(),
                }
                .into());
            }
            InventoryTransactionType::Waste if !adjustment.quantity_change.is_negative() => {
                return Err(ValidationError::InvalidFormat {
                    field: "quantityChange".to_string(),
                    reason: "waste must be negative".to_string(),
                }
                .into());
            }
            _ => {}
        }

        let branch_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = ?1)")
                .bind(&adjustment.branch_id)
                .fetch_one(&self.pool)
                .await?;
        if !branch_exists {
            return Err(DbError::not_found("Branch", &adjustment.branch_id));
        }

        let ingredient_name: String =
            sqlx::query_scalar("SELECT name FROM ingredients WHERE id = ?1")
                .bind(&adjustment.ingredient_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("Ingredient", &adjustment.ingredient_id))?;

        let mut tx = self.pool.begin().await?;
        let entry = Self::apply_movement(
            &mut *tx,
            &StockMovement {
                branch_id: &adjustment.branch_id,
                ingredient_id: &adjustment.ingredient_id,
                ingredient_name: &ingredient_name,
                quantity_change: adjustment.quantity_change,
                transaction_type: adjustment.transaction_type,
                order_id: None,
                created_by: &adjustment.created_by,
                notes: adjustment.notes.as_deref(),
            },
            policy,
        )
        .await?;
        tx.commit().await?;

        info!(
            branch_id = %entry.branch_id,
            ingredient = %ingredient_name,
            change = %entry.quantity_change,
            stock_after = %entry.stock_after,
            kind = ?entry.transaction_type,
            "Stock adjusted"
        );

        Ok(entry)
    }

    /// Current stock of one ingredient at a branch (zero if never stocked).
    pub async fn current_stock(&self, branch_id: &str, ingredient_id: &str) -> DbResult<Quantity> {
        let stock: Option<Quantity> = sqlx::query_scalar(
            "SELECT current_stock FROM branch_inventory WHERE branch_id = ?1 AND ingredient_id = ?2",
        )
        .bind(branch_id)
        .bind(ingredient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock.unwrap_or_else(Quantity::zero))
    }

    /// Every ingredient's level at `branch_id`, by ingredient name.
    pub async fn branch_stock(&self, branch_id: &str) -> DbResult<Vec<StockLevel>> {
        debug!(branch_id = %branch_id, "Loading branch stock");

        let branch_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = ?1)")
                .bind(branch_id)
                .fetch_one(&self.pool)
                .await?;
        if !branch_exists {
            return Err(DbError::not_found("Branch", branch_id));
        }

        let rows = sqlx::query_as::<_, StockRow>(
            "SELECT i.id AS ingredient_id,
                    i.name AS ingredient_name,
                    i.unit,
                    COALESCE(bi.current_stock, 0) AS current_stock,
                    i.reorder_threshold,
                    bi.last_updated
             FROM ingredients i
             LEFT JOIN branch_inventory bi
                    ON bi.ingredient_id = i.id AND bi.branch_id = ?1
             ORDER BY i.name",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    /// Levels at or below their reorder threshold (including negative ones).
    pub async fn low_stock(&self, branch_id: &str) -> DbResult<Vec<StockLevel>> {
        let levels = self.branch_stock(branch_id).await?;
        Ok(levels
            .into_iter()
            .filter(|level| level.status.needs_attention())
            .collect())
    }

    /// Ledger entries of a branch in append order, optionally for one ingredient.
    pub async fn ledger(
        &self,
        branch_id: &str,
        ingredient_id: Option<&str>,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let entries = sqlx::query_as::<_, InventoryTransaction>(&format!(
            "SELECT {} FROM inventory_transactions
             WHERE branch_id = ?1 AND (?2 IS NULL OR ingredient_id = ?2)
             ORDER BY sequence",
            LEDGER_COLUMNS
        ))
        .bind(branch_id)
        .bind(ingredient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Ledger entries written by one order.
    pub async fn for_order(&self, order_id: &str) -> DbResult<Vec<InventoryTransaction>> {
        let entries = sqlx::query_as::<_, InventoryTransaction>(&format!(
            "SELECT {} FROM inventory_transactions WHERE order_id = ?1 ORDER BY sequence",
            LEDGER_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Replays the ledger of one (branch, ingredient) pair against the
    /// stored stock level.
    pub async fn verify_ledger(&self, branch_id: &str, ingredient_id: &str) -> DbResult<LedgerCheck> {
        let entries = self.ledger(branch_id, Some(ingredient_id)).await?;
        let current_stock = self.current_stock(branch_id, ingredient_id).await?;

        let balanced = entries.iter().all(InventoryTransaction::is_balanced);
        let starts_at_zero = entries
            .first()
            .map_or(true, |first| first.stock_before.is_zero());
        let chained = starts_at_zero
            && entries
                .windows(2)
                .all(|pair| pair[0].stock_after == pair[1].stock_before);

        let mut replayed_stock = Quantity::zero();
        for entry in &entries {
            replayed_stock = replayed_stock
                .checked_add(entry.quantity_change)
                .ok_or(CoreError::Overflow("ledger replay"))?;
        }

        Ok(LedgerCheck {
            entries: entries.len(),
            balanced,
            chained,
            replayed_stock,
            current_stock,
            consistent: balanced && chained && replayed_stock == current_stock,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
