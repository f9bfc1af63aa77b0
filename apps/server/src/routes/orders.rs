//! # Order Endpoints
//!
//! ```text
//! POST /api/orders         checkout (201, or 200 for an idempotent replay)
//! GET  /api/orders         newest first: ?branchId=&limit=&offset=
//! GET  /api/orders/{id}    one order with items
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use brewline_core::{CartLine, Money, PaymentMethod, ValidationError};
use brewline_db::repository::order::OrderQuery;
use brewline_db::CheckoutRequest;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
}

// =============================================================================
// DTOs
// =============================================================================

/// Checkout request body. Fields are optional here so a missing one gets a
/// field-level message rather than a JSON parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    branch_id: Option<String>,
    cashier_id: Option<String>,
    #[serde(default)]
    items: Vec<CartLine>,
    payment_method: Option<String>,
    order_number: Option<i64>,
    idempotency_key: Option<String>,
}

impl CreateOrderBody {
    fn into_request(self) -> Result<CheckoutRequest, ValidationError> {
        let payment_method: PaymentMethod = self
            .payment_method
            .ok_or_else(|| ValidationError::required("paymentMethod"))?
            .parse()?;

        Ok(CheckoutRequest {
            branch_id: self.branch_id.ok_or_else(|| ValidationError::required("branchId"))?,
            cashier_id: self.cashier_id.ok_or_else(|| ValidationError::required("cashierId"))?,
            items: self.items,
            payment_method,
            order_number: self.order_number,
            idempotency_key: self.idempotency_key,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderConfirmation {
    id: String,
    order_number: i64,
    total: Money,
    transaction_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    branch_id: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/orders - process a cart
async fn create_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOrderBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = body.into_request()?;
    let receipt = state.checkout.process(&request).await?;

    let (status, message) = if receipt.replayed {
        (StatusCode::OK, "Order already processed")
    } else {
        (StatusCode::CREATED, "Order processed successfully")
    };

    let order = OrderConfirmation {
        id: receipt.order_id,
        order_number: receipt.order_number,
        total: receipt.total,
        transaction_hash: receipt.transaction_hash,
    };

    Ok((
        status,
        Json(json!({ "success": true, "order": order, "message": message })),
    ))
}

/// GET /api/orders - paginated listing
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<Value>> {
    let page = state
        .db
        .orders()
        .list(&OrderQuery {
            branch_id: query.branch_id,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "orders": page.orders,
        "pagination": {
            "total": page.total,
            "limit": page.limit,
            "offset": page.offset,
            "hasMore": page.has_more,
        },
    })))
}

/// GET /api/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state
        .db
        .orders()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    Ok(Json(json!({ "success": true, "order": order })))
}
