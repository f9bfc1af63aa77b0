//! # Order Repository
//!
//! Order numbering, order writes, and order listings.
//!
//! ## Order Numbers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  allocate_order_number() (first write of the tx)        │
//! │                                                                         │
//! │  branch_order_sequences                                                 │
//! │  ┌──────────────────┬───────────────────┐                               │
//! │  │ branch-downtown  │ 41                │ ── UPSERT +1 RETURNING ──► 42 │
//! │  │ branch-airport   │ 7                 │                               │
//! │  └──────────────────┴───────────────────┘                               │
//! │                                                                         │
//! │  Missing row: seeded from MAX(orders.order_number) for the branch.      │
//! │  Explicit number: counter raised to at least that number; the          │
//! │  UNIQUE(branch_id, order_number) index rejects a reused one.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The upsert takes SQLite's write lock, so two checkouts at the same branch
//! serialize on it and never see the same counter value.

use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use brewline_core::{Order, OrderItem, DEFAULT_ORDER_PAGE_SIZE, MAX_ORDER_PAGE_SIZE};

use crate::error::DbResult;

const ORDER_COLUMNS: &str = "o.id, o.branch_id, o.order_number, o.timestamp, o.cashier_id, \
     o.subtotal_cents, o.total_cents, o.payment_method, o.transaction_hash, o.synced, \
     o.shift_id, o.idempotency_key";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, menu_item_id, name, unit_price_cents, quantity, \
     subtotal_cents, recipe_version";

// =============================================================================
// Query / Result Types
// =============================================================================

/// Who rang up an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierSummary {
    pub username: String,
    pub name: String,
}

/// An order with its lines and cashier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub cashier: CashierSummary,
}

/// Order listing parameters.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub branch_id: Option<String>,
    /// Defaults to 100, clamped to 1..=500.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderQuery {
    fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ORDER_PAGE_SIZE)
            .clamp(1, MAX_ORDER_PAGE_SIZE)
    }

    fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// One page of orders, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<OrderWithItems>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

/// Order count and revenue attributed to one shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTotals {
    pub orders: i64,
    pub revenue_cents: i64,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    #[sqlx(flatten)]
    order: Order,
    cashier_username: String,
    cashier_name: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and order items.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Transactional writes (caller owns the transaction)
    // -------------------------------------------------------------------------

    /// Reserves the order number for a new order at `branch_id`.
    ///
    /// ## Arguments
    /// * `conn` - The checkout transaction; this must be its first write
    /// * `explicit` - A client-supplied number, or `None` for the next one
    pub async fn allocate_order_number(
        conn: &mut SqliteConnection,
        branch_id: &str,
        explicit: Option<i64>,
    ) -> DbResult<i64> {
        let number = match explicit {
            Some(number) => {
                sqlx::query(
                    "INSERT INTO branch_order_sequences (branch_id, last_order_number)
                     VALUES (?1, MAX(?2, (SELECT COALESCE(MAX(order_number), 0)
                                          FROM orders WHERE branch_id = ?1)))
                     ON CONFLICT(branch_id) DO UPDATE SET
                         last_order_number = MAX(last_order_number, ?2)",
                )
                .bind(branch_id)
                .bind(number)
                .execute(&mut *conn)
                .await?;
                number
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO branch_order_sequences (branch_id, last_order_number)
                     VALUES (?1, (SELECT COALESCE(MAX(order_number), 0)
                                  FROM orders WHERE branch_id = ?1) + 1)
                     ON CONFLICT(branch_id) DO UPDATE SET
                         last_order_number = MAX(last_order_number,
                             (SELECT COALESCE(MAX(order_number), 0)
                              FROM orders WHERE branch_id = excluded.branch_id)) + 1
                     RETURNING last_order_number",
                )
                .bind(branch_id)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        debug!(branch_id = %branch_id, order_number = number, "Order number allocated");
        Ok(number)
    }

    /// Inserts an order header.
    pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO orders
                (id, branch_id, order_number, timestamp, cashier_id, subtotal_cents, total_cents,
                 payment_method, transaction_hash, synced, shift_id, idempotency_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&order.id)
        .bind(&order.branch_id)
        .bind(order.order_number)
        .bind(order.timestamp)
        .bind(&order.cashier_id)
        .bind(order.subtotal_cents)
        .bind(order.total_cents)
        .bind(order.payment_method)
        .bind(&order.transaction_hash)
        .bind(order.synced)
        .bind(&order.shift_id)
        .bind(&order.idempotency_key)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one order line.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO order_items
                (id, order_id, menu_item_id, name, unit_price_cents, quantity, subtotal_cents, recipe_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.menu_item_id)
        .bind(&item.name)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.subtotal_cents)
        .bind(item.recipe_version)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Finds the order a client already submitted under `key`.
    pub async fn find_by_idempotency_key(&self, branch_id: &str, key: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders o WHERE o.branch_id = ?1 AND o.idempotency_key = ?2",
            ORDER_COLUMNS
        ))
        .bind(branch_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets one order with its items.
    pub async fn get(&self, id: &str) -> DbResult<Option<OrderWithItems>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {}, u.username AS cashier_username, u.name AS cashier_name
             FROM orders o JOIN users u ON u.id = o.cashier_id
             WHERE o.id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Lists orders newest first, with items and cashier.
    pub async fn list(&self, query: &OrderQuery) -> DbResult<OrderPage> {
        let limit = query.effective_limit();
        let offset = query.effective_offset();

        debug!(branch_id = ?query.branch_id, limit, offset, "Listing orders");

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE (?1 IS NULL OR branch_id = ?1)")
                .bind(&query.branch_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {}, u.username AS cashier_username, u.name AS cashier_name
             FROM orders o JOIN users u ON u.id = o.cashier_id
             WHERE (?1 IS NULL OR o.branch_id = ?1)
             ORDER BY o.timestamp DESC, o.order_number DESC
             LIMIT ?2 OFFSET ?3",
            ORDER_COLUMNS
        ))
        .bind(&query.branch_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let orders = self.attach_items(rows).await?;
        let has_more = offset + (orders.len() as i64) < total;

        Ok(OrderPage {
            orders,
            total,
            limit,
            offset,
            has_more,
        })
    }

    /// Count and sum of the orders tied to `shift_id`.
    pub async fn shift_totals(&self, shift_id: &str) -> DbResult<ShiftTotals> {
        let totals = sqlx::query_as::<_, ShiftTotals>(
            "SELECT COUNT(*) AS orders, COALESCE(SUM(total_cents), 0) AS revenue_cents
             FROM orders WHERE shift_id = ?1",
        )
        .bind(shift_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Items of one order, in insertion order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY rowid",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> DbResult<Vec<OrderWithItems>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM order_items WHERE order_id IN (",
            ORDER_ITEM_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for row in &rows {
            separated.push_bind(row.order.id.as_str());
        }
        separated.push_unseparated(") ORDER BY rowid");

        let items = builder
            .build_query_as::<OrderItem>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id.clone()).or_default().push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| OrderWithItems {
                items: by_order.remove(&row.order.id).unwrap_or_default(),
                cashier: CashierSummary {
                    username: row.cashier_username,
                    name: row.cashier_name,
                },
                order: row.order,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_clamping() {
        assert_eq!(OrderQuery::default().effective_limit(), 100);
        let huge = OrderQuery {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(huge.effective_limit(), 500);
        let zero = OrderQuery {
            limit: Some(0),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(zero.effective_limit(), 1);
        assert_eq!(zero.effective_offset(), 0);
    }
}
