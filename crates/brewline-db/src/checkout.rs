//! # Checkout
//!
//! The order-processing transaction: resolve, price, bind, and persist an
//! order with its inventory deductions as one atomic unit.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CheckoutService::process()                           │
//! │                                                                         │
//! │  1. validate shape ─────────────────────────► Validation / EmptyCart    │
//! │  2. idempotency key seen? ──────────────────► replay (no writes)        │
//! │  3. cashier, branch ────────────────────────► CashierNotFound / ...     │
//! │  4. shift binding (cashiers only) ──────────► NoOpenShift / Mismatch    │
//! │  5. resolve catalog, price_cart, plan_deductions                        │
//! │        (every line checked, nothing written yet)                        │
//! │                                                                         │
//! │  6. BEGIN ─────────────────────────────────────────────────────────┐    │
//! │     allocate_order_number      (first write: takes the write lock) │    │
//! │     fingerprint                                                    │    │
//! │     INSERT order, order_items                                      │    │
//! │     apply_movement × deductions (stock upsert + ledger entry)      │    │
//! │  COMMIT ───────────────────────────────────────────────────────────┘    │
//! │     any error → transaction dropped → rolled back                       │
//! │                                                                         │
//! │  7. CheckoutReceipt { id, number, total, hash }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retries
//! Rows written around the counter are folded in by the allocator, which
//! bumps from `MAX(counter, MAX(order_number))`. An auto-allocated number
//! that still collides, or a `SQLITE_BUSY`, is retried up to
//! [`MAX_ATTEMPTS`] times in total and then surfaces as a persistence
//! failure. An explicit number that is taken is never retried.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use brewline_core::validation::{
    validate_id, validate_idempotency_key, validate_order_number,
};
use brewline_core::{
    plan_deductions, price_cart, CartLine, CoreError, Deduction, FingerprintInput,
    InventoryTransactionType, Money, Order, OrderFingerprint, OrderItem, PaymentMethod,
    PricedCart, Quantity, ResolvedMenuItem, StockPolicy, ValidationError,
};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::inventory::{InventoryRepository, StockMovement};
use crate::repository::now;
use crate::repository::order::OrderRepository;

/// Attempts made for one checkout before giving up on conflicts.
pub const MAX_ATTEMPTS: usize = 3;

// =============================================================================
// Request / Receipt
// =============================================================================

/// A cart submitted at a till.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub branch_id: String,
    pub cashier_id: String,
    pub items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    /// Client-chosen number; allocated from the branch counter when `None`.
    pub order_number: Option<i64>,
    /// Deduplicates resubmissions of the same cart.
    pub idempotency_key: Option<String>,
}

/// What the till gets back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub order_number: i64,
    pub total: Money,
    pub transaction_hash: String,
    pub shift_id: Option<String>,
    /// True when an earlier order with the same idempotency key was returned.
    pub replayed: bool,
}

impl From<&Order> for CheckoutReceipt {
    fn from(order: &Order) -> Self {
        CheckoutReceipt {
            order_id: order.id.clone(),
            order_number: order.order_number,
            total: order.total(),
            transaction_hash: order.transaction_hash.clone(),
            shift_id: order.shift_id.clone(),
            replayed: false,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Checkout failures.
///
/// ## Taxonomy
/// ```text
/// fix your input   Validation, EmptyCart                         (400)
/// not found        CashierNotFound, BranchNotFound, MenuItemNotFound (404)
/// state conflict   MenuItemInactive, NoOpenShift, ShiftBranchMismatch,
///                  InsufficientStock                             (400)
///                  DuplicateOrderNumber                          (409)
/// try again later  Persistence                                   (500)
/// ```
/// Only `Persistence` can happen after the transaction opened, and it always
/// leaves the database as it was.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Order must contain at least one item")]
    EmptyCart,

    #[error("Cashier not found")]
    CashierNotFound(String),

    #[error("Branch not found")]
    BranchNotFound(String),

    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    #[error("Menu item {name} is not available")]
    MenuItemInactive { name: String },

    #[error("No active shift found. Please open a shift first.")]
    NoOpenShift,

    #[error("Active shift is for a different branch")]
    ShiftBranchMismatch,

    #[error("Insufficient stock for {ingredient}: available {available}, requested {requested}")]
    InsufficientStock {
        ingredient: String,
        available: Quantity,
        requested: Quantity,
    },

    #[error("Order number {order_number} is already used at branch {branch_id}")]
    DuplicateOrderNumber { branch_id: String, order_number: i64 },

    #[error("Failed to process order")]
    Persistence(#[source] DbError),
}

impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => CheckoutError::EmptyCart,
            CoreError::MenuItemNotFound(id) => CheckoutError::MenuItemNotFound(id),
            CoreError::MenuItemInactive { name } => CheckoutError::MenuItemInactive { name },
            CoreError::InsufficientStock {
                ingredient,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                ingredient,
                available,
                requested,
            },
            CoreError::NoOpenShift => CheckoutError::NoOpenShift,
            CoreError::ShiftBranchMismatch => CheckoutError::ShiftBranchMismatch,
            CoreError::Validation(err) => CheckoutError::Validation(err),
            CoreError::CartTooLarge { max } => CheckoutError::Validation(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: max as i64,
            }),
            other => CheckoutError::Persistence(DbError::Domain(other)),
        }
    }
}

impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            other => CheckoutError::Persistence(other),
        }
    }
}

impl CheckoutError {
    /// The underlying reason of a persistence failure, for operators.
    pub fn details(&self) -> Option<String> {
        match self {
            CheckoutError::Persistence(source) => Some(source.to_string()),
            _ => None,
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Service
// =============================================================================

/// Runs checkouts against one database.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    fingerprint: OrderFingerprint,
    policy: StockPolicy,
}

/// Everything decided before the transaction opens.
struct PreparedOrder {
    shift_id: Option<String>,
    priced: PricedCart,
    deductions: Vec<Deduction>,
}

impl CheckoutService {
    pub fn new(db: Database, fingerprint: OrderFingerprint, policy: StockPolicy) -> Self {
        CheckoutService {
            db,
            fingerprint,
            policy,
        }
    }

    pub fn fingerprint(&self) -> &OrderFingerprint {
        &self.fingerprint
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Processes one order.
    ///
    /// ## Returns
    /// * `Ok(CheckoutReceipt)` - The order and all its deductions are committed
    /// * `Err(CheckoutError)` - Nothing was written
    pub async fn process(&self, request: &CheckoutRequest) -> CheckoutResult<CheckoutReceipt> {
        let idempotency_key = validate_request(request)?;

        if let Some(key) = &idempotency_key {
            if let Some(existing) = self
                .db
                .orders()
                .find_by_idempotency_key(&request.branch_id, key)
                .await?
            {
                info!(order_id = %existing.id, key = %key, "Replaying order for idempotency key");
                return Ok(CheckoutReceipt {
                    replayed: true,
                    ..CheckoutReceipt::from(&existing)
                });
            }
        }

        let prepared = self.prepare(request).await?;

        let mut attempt = 1;
        loop {
            match self.write_order(request, idempotency_key.as_deref(), &prepared).await {
                Ok(order) => {
                    info!(
                        order_id = %order.id,
                        branch_id = %order.branch_id,
                        order_number = order.order_number,
                        total = %order.total(),
                        lines = prepared.priced.lines.len(),
                        deductions = prepared.deductions.len(),
                        "Order processed"
                    );
                    return Ok(CheckoutReceipt::from(&order));
                }
                Err(err) => {
                    let is_key_race = err.is_unique_on("idempotency_key");
                    let is_number_clash = err.is_unique_on("order_number");

                    if is_key_race {
                        if let Some(key) = &idempotency_key {
                            if let Some(winner) = self
                                .db
                                .orders()
                                .find_by_idempotency_key(&request.branch_id, key)
                                .await?
                            {
                                return Ok(CheckoutReceipt {
                                    replayed: true,
                                    ..CheckoutReceipt::from(&winner)
                                });
                            }
                        }
                    }

                    if is_number_clash {
                        if let Some(order_number) = request.order_number {
                            return Err(CheckoutError::DuplicateOrderNumber {
                                branch_id: request.branch_id.clone(),
                                order_number,
                            });
                        }
                    }

                    let retryable = is_number_clash || matches!(err, DbError::Busy);
                    if retryable && attempt < MAX_ATTEMPTS {
                        warn!(attempt, error = %err, "Checkout conflicted, retrying");
                        attempt += 1;
                        continue;
                    }

                    if !matches!(err, DbError::Domain(_)) {
                        error!(error = %err, branch_id = %request.branch_id, "Order transaction failed");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Steps 3-5: lookups, shift binding, pricing and planning. No writes.
    async fn prepare(&self, request: &CheckoutRequest) -> CheckoutResult<PreparedOrder> {
        let cashier = self
            .db
            .users()
            .get_by_id(&request.cashier_id)
            .await?
            .ok_or_else(|| CheckoutError::CashierNotFound(request.cashier_id.clone()))?;

        if self.db.branches().get(&request.branch_id).await?.is_none() {
            return Err(CheckoutError::BranchNotFound(request.branch_id.clone()));
        }

        let shift_id = if cashier.role.requires_shift() {
            let shift = self
                .db
                .shifts()
                .bind_for_order(&cashier.id, &request.branch_id)
                .await?;
            Some(shift.id)
        } else {
            None
        };

        let mut ids: Vec<String> = request
            .items
            .iter()
            .map(|line| line.menu_item_id.clone())
            .collect();
        ids.sort();
        ids.dedup();

        let catalog: HashMap<String, ResolvedMenuItem> =
            self.db.catalog().resolve_menu_items(&ids).await?;
        let priced = price_cart(&request.items, &catalog)?;
        let deductions = plan_deductions(&priced.lines, &catalog)?;

        debug!(
            cashier_id = %cashier.id,
            shift_id = ?shift_id,
            total = %priced.total,
            deductions = deductions.len(),
            "Order prepared"
        );

        Ok(PreparedOrder {
            shift_id,
            priced,
            deductions,
        })
    }

    /// Step 6: the atomic write. Dropping the transaction on any error rolls
    /// every statement back.
    async fn write_order(
        &self,
        request: &CheckoutRequest,
        idempotency_key: Option<&str>,
        prepared: &PreparedOrder,
    ) -> Result<Order, DbError> {
        let mut tx = self.db.pool().begin().await?;

        let order_number =
            OrderRepository::allocate_order_number(&mut *tx, &request.branch_id, request.order_number)
                .await?;

        let timestamp = now();
        let total = prepared.priced.total;
        let transaction_hash = self.fingerprint.sign(&FingerprintInput {
            branch_id: &request.branch_id,
            order_number,
            total,
            cashier_id: &request.cashier_id,
            timestamp,
        });

        let order = Order {
            id: Uuid::new_v4().to_string(),
            branch_id: request.branch_id.clone(),
            order_number,
            timestamp,
            cashier_id: request.cashier_id.clone(),
            subtotal_cents: prepared.priced.subtotal.cents(),
            total_cents: total.cents(),
            payment_method: request.payment_method,
            transaction_hash,
            synced: false,
            shift_id: prepared.shift_id.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
        };
        OrderRepository::insert_order(&mut *tx, &order).await?;

        for line in &prepared.priced.lines {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                menu_item_id: line.menu_item_id.clone(),
                name: line.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                subtotal_cents: line.subtotal.cents(),
                recipe_version: line.recipe_version,
            };
            OrderRepository::insert_item(&mut *tx, &item).await?;
        }

        for deduction in &prepared.deductions {
            InventoryRepository::apply_movement(
                &mut *tx,
                &StockMovement {
                    branch_id: &request.branch_id,
                    ingredient_id: &deduction.ingredient_id,
                    ingredient_name: &deduction.ingredient_name,
                    quantity_change: deduction.quantity_change,
                    transaction_type: InventoryTransactionType::Sale,
                    order_id: Some(&order.id),
                    created_by: &request.cashier_id,
                    notes: None,
                },
                self.policy,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }
}

/// Step 1. Returns the trimmed idempotency key, if any.
fn validate_request(request: &CheckoutRequest) -> CheckoutResult<Option<String>> {
    validate_id("branchId", &request.branch_id)?;
    validate_id("cashierId", &request.cashier_id)?;
    if request.items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if let Some(number) = request.order_number {
        validate_order_number(number)?;
    }
    let key = request
        .idempotency_key
        .as_deref()
        .map(validate_idempotency_key)
        .transpose()?;
    Ok(key)
}
