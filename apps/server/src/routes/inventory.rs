//! # Inventory Endpoints
//!
//! ```text
//! GET  /api/inventory                ?branchId=   stock with status
//! GET  /api/inventory/low-stock      ?branchId=   advisory alerts
//! POST /api/inventory/adjustments    restock / count correction / waste
//! GET  /api/inventory/ledger         ?branchId=&ingredientId=
//! ```
//!
//! Low-stock alerts are read-only; checkout never consults them.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use brewline_core::{InventoryTransactionType, Quantity, ValidationError};
use brewline_db::repository::inventory::StockAdjustment;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(branch_stock))
        .route("/api/inventory/low-stock", get(low_stock))
        .route("/api/inventory/adjustments", post(adjust_stock))
        .route("/api/inventory/ledger", get(ledger))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchQuery {
    branch_id: Option<String>,
}

impl BranchQuery {
    fn require_branch(self) -> Result<String, ValidationError> {
        self.branch_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ValidationError::required("branchId"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    branch_id: Option<String>,
    ingredient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentBody {
    branch_id: Option<String>,
    ingredient_id: Option<String>,
    /// Signed decimal, e.g. "25" or "-1.5"
    quantity_change: Option<Quantity>,
    transaction_type: Option<InventoryTransactionType>,
    created_by: Option<String>,
    notes: Option<String>,
}

/// GET /api/inventory
async fn branch_stock(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Json<Value>> {
    let branch_id = query.require_branch()?;
    let levels = state.db.inventory().branch_stock(&branch_id).await?;

    Ok(Json(json!({ "success": true, "branchId": branch_id, "inventory": levels })))
}

/// GET /api/inventory/low-stock
async fn low_stock(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Json<Value>> {
    let branch_id = query.require_branch()?;
    let alerts = state.db.inventory().low_stock(&branch_id).await?;

    Ok(Json(json!({
        "success": true,
        "branchId": branch_id,
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// POST /api/inventory/adjustments
async fn adjust_stock(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AdjustmentBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let adjustment = StockAdjustment {
        branch_id: body.branch_id.ok_or_else(|| ValidationError::required("branchId"))?,
        ingredient_id: body
            .ingredient_id
            .ok_or_else(|| ValidationError::required("ingredientId"))?,
        quantity_change: body
            .quantity_change
            .ok_or_else(|| ValidationError::required("quantityChange"))?,
        transaction_type: body
            .transaction_type
            .ok_or_else(|| ValidationError::required("transactionType"))?,
        created_by: body.created_by.ok_or_else(|| ValidationError::required("createdBy"))?,
        notes: body.notes,
    };

    let entry = state
        .db
        .inventory()
        .adjust(&adjustment, state.checkout.policy())
        .await?;

    info!(
        branch_id = %entry.branch_id,
        ingredient_id = %entry.ingredient_id,
        kind = ?entry.transaction_type,
        stock_after = %entry.stock_after,
        "Stock adjusted"
    );

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "transaction": entry }))))
}

/// GET /api/inventory/ledger - entries in append order, with a replay check
/// when one ingredient is selected
async fn ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Json<Value>> {
    let branch_id = query
        .branch_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::required("branchId"))?;

    let inventory = state.db.inventory();
    let entries = inventory
        .ledger(&branch_id, query.ingredient_id.as_deref())
        .await?;

    let check = match &query.ingredient_id {
        Some(ingredient_id) => Some(inventory.verify_ledger(&branch_id, ingredient_id).await?),
        None => None,
    };

    Ok(Json(json!({ "success": true, "entries": entries, "check": check })))
}
