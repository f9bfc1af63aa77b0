//! Recipe lines. Adding or removing one bumps the menu item's recipe version.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use brewline_core::{Quantity, ValidationError};
use brewline_db::repository::catalog::NewRecipeLine;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(add_recipe_line))
        .route("/api/recipes/{id}", delete(remove_recipe_line))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeQuery {
    menu_item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecipeLineBody {
    menu_item_id: Option<String>,
    ingredient_id: Option<String>,
    /// Decimal string or number, e.g. "0.018"
    quantity_required: Option<Quantity>,
}

/// GET /api/recipes
async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> ApiResult<Json<Value>> {
    let recipes = state
        .db
        .catalog()
        .list_recipes(query.menu_item_id.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "recipes": recipes })))
}

/// POST /api/recipes
async fn add_recipe_line(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddRecipeLineBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let line = NewRecipeLine {
        menu_item_id: body
            .menu_item_id
            .ok_or_else(|| ValidationError::required("menuItemId"))?,
        ingredient_id: body
            .ingredient_id
            .ok_or_else(|| ValidationError::required("ingredientId"))?,
        quantity_required: body
            .quantity_required
            .ok_or_else(|| ValidationError::required("quantityRequired"))?,
    };

    let recipe = state.db.catalog().add_recipe_line(&line).await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "recipe": recipe }))))
}

/// DELETE /api/recipes/{id}
async fn remove_recipe_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.catalog().remove_recipe_line(&id).await?;

    Ok(Json(json!({ "success": true, "message": "Recipe line removed" })))
}
