//! # Shift Repository
//!
//! Cashier shifts: opening, binding orders to the open shift, and closing
//! with a revenue summary.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open()      ── snapshot branch order count + revenue ──► is_closed = 0 │
//! │     │                                                                   │
//! │     │  checkout: bind_for_order(cashier, branch)                        │
//! │     │    ├── no open shift        → NoOpenShift                         │
//! │     │    └── shift at other branch → ShiftBranchMismatch                │
//! │     ▼                                                                   │
//! │  close()     ── count + sum orders WHERE shift_id = id ──► is_closed = 1│
//! │                 (single UPDATE, so no order can slip in between)       │
//! │                                                                         │
//! │  A partial unique index keeps at most one open shift per cashier.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use brewline_core::validation::validate_cash_cents;
use brewline_core::{CoreError, Shift, ShiftStatus};

use super::now;
use crate::error::{DbError, DbResult};

const SHIFT_COLUMNS: &str = "id, branch_id, cashier_id, start_time, end_time, opening_cash_cents, \
     closing_cash_cents, opening_orders, opening_revenue_cents, closing_orders, \
     closing_revenue_cents, is_closed, notes";

/// Input for [`ShiftRepository::open`].
#[derive(Debug, Clone)]
pub struct OpenShift {
    pub branch_id: String,
    pub cashier_id: String,
    pub opening_cash_cents: i64,
    pub notes: Option<String>,
}

/// Input for [`ShiftRepository::close`].
#[derive(Debug, Clone)]
pub struct CloseShift {
    pub closing_cash_cents: i64,
    /// Replaces the shift's notes when given.
    pub notes: Option<String>,
}

/// Shift listing filter.
#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub branch_id: Option<String>,
    pub cashier_id: Option<String>,
    pub status: Option<ShiftStatus>,
}

/// A shift with its cashier's name and live order totals.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub shift: Shift,
    pub cashier_name: String,
    pub order_count: i64,
    pub revenue_cents: i64,
}

/// Repository for cashier shifts.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {} FROM shifts WHERE id = ?1",
            SHIFT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// The cashier's open shift, if any.
    pub async fn find_open_for_cashier(&self, cashier_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {} FROM shifts WHERE cashier_id = ?1 AND is_closed = 0",
            SHIFT_COLUMNS
        ))
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Finds the shift an order by `cashier_id` at `branch_id` belongs to.
    ///
    /// ## Returns
    /// * `Ok(Shift)` - The cashier's open shift at this branch
    /// * `Err(DbError::Domain(NoOpenShift))` - No open shift
    /// * `Err(DbError::Domain(ShiftBranchMismatch))` - Open shift is elsewhere
    pub async fn bind_for_order(&self, cashier_id: &str, branch_id: &str) -> DbResult<Shift> {
        let shift = self
            .find_open_for_cashier(cashier_id)
            .await?
            .ok_or(CoreError::NoOpenShift)?;

        if shift.branch_id != branch_id {
            warn!(
                cashier_id = %cashier_id,
                shift_branch = %shift.branch_id,
                order_branch = %branch_id,
                "Order branch does not match open shift"
            );
            return Err(CoreError::ShiftBranchMismatch.into());
        }

        Ok(shift)
    }

    /// Opens a shift, recording the branch's order count and revenue so far.
    pub async fn open(&self, request: &OpenShift) -> DbResult<Shift> {
        validate_cash_cents("openingCash", request.opening_cash_cents)?;

        let cashier_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
                .bind(&request.cashier_id)
                .fetch_one(&self.pool)
                .await?;
        if !cashier_exists {
            return Err(DbError::not_found("User", &request.cashier_id));
        }

        let branch_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = ?1)")
                .bind(&request.branch_id)
                .fetch_one(&self.pool)
                .await?;
        if !branch_exists {
            return Err(DbError::not_found("Branch", &request.branch_id));
        }

        if let Some(existing) = self.find_open_for_cashier(&request.cashier_id).await? {
            return Err(CoreError::ShiftAlreadyOpen {
                shift_id: existing.id,
            }
            .into());
        }

        let (opening_orders, opening_revenue_cents): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM orders WHERE branch_id = ?1",
        )
        .bind(&request.branch_id)
        .fetch_one(&self.pool)
        .await?;

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            branch_id: request.branch_id.clone(),
            cashier_id: request.cashier_id.clone(),
            start_time: now(),
            end_time: None,
            opening_cash_cents: request.opening_cash_cents,
            closing_cash_cents: None,
            opening_orders,
            opening_revenue_cents,
            closing_orders: None,
            closing_revenue_cents: None,
            is_closed: false,
            notes: request.notes.clone(),
        };

        debug!(id = %shift.id, cashier_id = %shift.cashier_id, "Opening shift");

        let inserted = sqlx::query(
            "INSERT INTO shifts
                (id, branch_id, cashier_id, start_time, opening_cash_cents,
                 opening_orders, opening_revenue_cents, is_closed, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        )
        .bind(&shift.id)
        .bind(&shift.branch_id)
        .bind(&shift.cashier_id)
        .bind(shift.start_time)
        .bind(shift.opening_cash_cents)
        .bind(shift.opening_orders)
        .bind(shift.opening_revenue_cents)
        .bind(&shift.notes)
        .execute(&self.pool)
        .await
        .map_err(DbError::from);

        match inserted {
            Ok(_) => {}
            // Lost a race with another open for the same cashier
            Err(err) if err.is_unique_on("shifts.cashier_id") => {
                let shift_id = self
                    .find_open_for_cashier(&request.cashier_id)
                    .await?
                    .map(|s| s.id)
                    .unwrap_or_default();
                return Err(CoreError::ShiftAlreadyOpen { shift_id }.into());
            }
            Err(err) => return Err(err),
        }

        info!(
            id = %shift.id,
            branch_id = %shift.branch_id,
            cashier_id = %shift.cashier_id,
            opening_cash_cents = shift.opening_cash_cents,
            "Shift opened"
        );

        Ok(shift)
    }

    /// Closes a shift and fixes its order count and revenue.
    ///
    /// ## Returns
    /// * `Ok(Shift)` - The closed shift
    /// * `Err(DbError::NotFound)` - No such shift
    /// * `Err(DbError::Domain(ShiftAlreadyClosed))` - Closed earlier
    pub async fn close(&self, id: &str, request: &CloseShift) -> DbResult<Shift> {
        validate_cash_cents("closingCash", request.closing_cash_cents)?;

        let closed = sqlx::query_as::<_, Shift>(&format!(
            "UPDATE shifts SET
                 closing_cash_cents = ?2,
                 end_time = ?3,
                 is_closed = 1,
                 closing_orders = (SELECT COUNT(*) FROM orders WHERE shift_id = ?1),
                 closing_revenue_cents =
                     (SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE shift_id = ?1),
                 notes = COALESCE(?4, notes)
             WHERE id = ?1 AND is_closed = 0
             RETURNING {}",
            SHIFT_COLUMNS
        ))
        .bind(id)
        .bind(request.closing_cash_cents)
        .bind(now())
        .bind(&request.notes)
        .fetch_optional(&self.pool)
        .await?;

        let Some(shift) = closed else {
            return match self.get(id).await? {
                Some(_) => Err(CoreError::ShiftAlreadyClosed(id.to_string()).into()),
                None => Err(DbError::not_found("Shift", id)),
            };
        };

        info!(
            id = %shift.id,
            orders = ?shift.closing_orders,
            revenue_cents = ?shift.closing_revenue_cents,
            closing_cash_cents = ?shift.closing_cash_cents,
            "Shift closed"
        );

        Ok(shift)
    }

    /// Lists shifts newest first.
    pub async fn list(&self, filter: &ShiftFilter) -> DbResult<Vec<ShiftSummary>> {
        let is_closed = filter.status.map(|status| status == ShiftStatus::Closed);

        let shifts = sqlx::query_as::<_, ShiftSummary>(
            "SELECT s.id, s.branch_id, s.cashier_id, s.start_time, s.end_time,
                    s.opening_cash_cents, s.closing_cash_cents, s.opening_orders,
                    s.opening_revenue_cents, s.closing_orders, s.closing_revenue_cents,
                    s.is_closed, s.notes,
                    u.name AS cashier_name,
                    (SELECT COUNT(*) FROM orders o WHERE o.shift_id = s.id) AS order_count,
                    (SELECT COALESCE(SUM(o.total_cents), 0) FROM orders o WHERE o.shift_id = s.id)
                        AS revenue_cents
             FROM shifts s JOIN users u ON u.id = s.cashier_id
             WHERE (?1 IS NULL OR s.branch_id = ?1)
               AND (?2 IS NULL OR s.cashier_id = ?2)
               AND (?3 IS NULL OR s.is_closed = ?3)
             ORDER BY s.start_time DESC",
        )
        .bind(&filter.branch_id)
        .bind(&filter.cashier_id)
        .bind(is_closed)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
