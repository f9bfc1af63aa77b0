//! # Shift Endpoints
//!
//! ```text
//! GET   /api/shifts        ?branchId=&cashierId=&status=open|closed
//! POST  /api/shifts        open { branchId, cashierId, openingCash, notes? }
//! PATCH /api/shifts/{id}   close { closingCash, notes? }
//! POST  /api/shifts/{id}   close { _method: "PATCH", closingCash, notes? }
//! ```
//!
//! Some gateways only pass GET and POST, so closing is reachable through a
//! POST carrying `_method: "PATCH"`. Both verbs run the same close. Cash
//! amounts are integer cents.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use brewline_core::{ShiftStatus, ValidationError};
use brewline_db::repository::shift::{CloseShift, OpenShift, ShiftFilter};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shifts", get(list_shifts).post(open_shift))
        .route(
            "/api/shifts/{id}",
            axum::routing::patch(close_shift).post(close_shift_override),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListShiftsQuery {
    branch_id: Option<String>,
    cashier_id: Option<String>,
    status: Option<ShiftStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftBody {
    branch_id: Option<String>,
    cashier_id: Option<String>,
    opening_cash: Option<i64>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftBody {
    #[serde(rename = "_method")]
    method: Option<String>,
    closing_cash: Option<i64>,
    notes: Option<String>,
}

/// GET /api/shifts
async fn list_shifts(
    State(state): State<AppState>,
    Query(query): Query<ListShiftsQuery>,
) -> ApiResult<Json<Value>> {
    let shifts = state
        .db
        .shifts()
        .list(&ShiftFilter {
            branch_id: query.branch_id,
            cashier_id: query.cashier_id,
            status: query.status,
        })
        .await?;

    Ok(Json(json!({ "success": true, "shifts": shifts })))
}

/// POST /api/shifts - open a shift
async fn open_shift(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OpenShiftBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = OpenShift {
        branch_id: body.branch_id.ok_or_else(|| ValidationError::required("branchId"))?,
        cashier_id: body.cashier_id.ok_or_else(|| ValidationError::required("cashierId"))?,
        opening_cash_cents: body
            .opening_cash
            .ok_or_else(|| ValidationError::required("openingCash"))?,
        notes: body.notes,
    };

    let shift = state.db.shifts().open(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "shift": shift, "message": "Shift opened successfully" })),
    ))
}

/// PATCH /api/shifts/{id} - close a shift
async fn close_shift(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CloseShiftBody>,
) -> ApiResult<Json<Value>> {
    close(&state, &id, body).await
}

/// POST /api/shifts/{id} - close a shift through the `_method` override
async fn close_shift_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CloseShiftBody>,
) -> ApiResult<Json<Value>> {
    if !body
        .method
        .as_deref()
        .is_some_and(|method| method.eq_ignore_ascii_case("PATCH"))
    {
        warn!(shift_id = %id, method = ?body.method, "POST to shift without PATCH override");
        return Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            "Method not allowed",
        ));
    }

    close(&state, &id, body).await
}

async fn close(state: &AppState, id: &str, body: CloseShiftBody) -> ApiResult<Json<Value>> {
    let request = CloseShift {
        closing_cash_cents: body
            .closing_cash
            .ok_or_else(|| ValidationError::required("closingCash"))?,
        notes: body.notes,
    };

    let shift = state
        .db
        .shifts()
        .close(id, &request)
        .await
        .map_err(|err| ApiError::with_operator_details(err, "Failed to close shift"))?;

    Ok(Json(json!({ "success": true, "shift": shift, "message": "Shift closed successfully" })))
}
