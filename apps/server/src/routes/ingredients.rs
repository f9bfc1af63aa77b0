//! Ingredient administration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use brewline_core::{Quantity, ValidationError};
use brewline_db::repository::catalog::{IngredientPatch, InitialStock, NewIngredient};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/api/ingredients/{id}", patch(update_ingredient))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngredientBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    cost_per_unit_cents: i64,
    reorder_threshold: Option<Quantity>,
    initial_stock: Option<InitialStockBody>,
}

/// Opening stock recorded as a RESTOCK at one branch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialStockBody {
    branch_id: String,
    quantity: Quantity,
    created_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIngredientBody {
    name: Option<String>,
    unit: Option<String>,
    cost_per_unit_cents: Option<i64>,
    reorder_threshold: Option<Quantity>,
}

/// GET /api/ingredients
async fn list_ingredients(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let ingredients = state.db.catalog().list_ingredients().await?;
    Ok(Json(json!({ "success": true, "ingredients": ingredients })))
}

/// POST /api/ingredients
async fn create_ingredient(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateIngredientBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new_ingredient = NewIngredient {
        id: None,
        name: body.name,
        unit: body.unit,
        cost_per_unit_cents: body.cost_per_unit_cents,
        reorder_threshold: body
            .reorder_threshold
            .ok_or_else(|| ValidationError::required("reorderThreshold"))?,
        initial_stock: body.initial_stock.map(|stock| InitialStock {
            branch_id: stock.branch_id,
            quantity: stock.quantity,
            created_by: stock.created_by,
        }),
    };

    let ingredient = state.db.catalog().create_ingredient(&new_ingredient).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "ingredient": ingredient })),
    ))
}

/// PATCH /api/ingredients/{id}
async fn update_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateIngredientBody>,
) -> ApiResult<Json<Value>> {
    let patch = IngredientPatch {
        name: body.name,
        unit: body.unit,
        cost_per_unit_cents: body.cost_per_unit_cents,
        reorder_threshold: body.reorder_threshold,
    };

    let ingredient = state.db.catalog().update_ingredient(&id, &patch).await?;

    Ok(Json(json!({ "success": true, "ingredient": ingredient })))
}
